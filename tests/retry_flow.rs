// Retry budget behavior across tools, scopes, and tracking modes.
//
// Exercises the decision engine the way an embedding framework would:
// report outcomes per (scope, tool) pair and act on the returned decision.

use reflect_retry::{
    Decision, ErrorDescription, RetryConfig, RetryDecisionEngine, ScopeContext, ScopeKey,
    ScopeMode, ToolOutcome, TrackingScope, json_status_error,
};
use serde_json::json;

fn engine(max_retries: u32) -> RetryDecisionEngine {
    RetryDecisionEngine::new(RetryConfig {
        max_retries,
        ..RetryConfig::default()
    })
}

#[test]
fn every_failure_within_budget_grants_a_retry() {
    let engine = engine(4);
    let scope = ScopeKey::from("inv-1");

    for attempt in 1..=4 {
        let decision = engine.on_tool_result(&scope, "search", ToolOutcome::exception("down"));
        match decision {
            Decision::Retry(guidance) => {
                assert_eq!(guidance.attempt, attempt);
                assert_eq!(guidance.tool_name, "search");
            }
            other => panic!("attempt {attempt}: expected retry, got {other:?}"),
        }
    }

    assert!(
        engine
            .on_tool_result(&scope, "search", ToolOutcome::exception("down"))
            .is_give_up()
    );
}

#[test]
fn success_clears_carry_over_between_failure_runs() {
    let engine = engine(3);
    let scope = ScopeKey::from("inv-1");

    for _ in 0..3 {
        assert!(
            engine
                .on_tool_result(&scope, "search", ToolOutcome::exception("down"))
                .is_retry()
        );
    }

    assert!(
        engine
            .on_tool_result(&scope, "search", ToolOutcome::success(json!("ok")))
            .is_accept()
    );

    // Second run gets the full budget again.
    for _ in 0..3 {
        assert!(
            engine
                .on_tool_result(&scope, "search", ToolOutcome::exception("down"))
                .is_retry()
        );
    }
}

#[test]
fn tools_in_the_same_scope_are_independent() {
    let engine = engine(2);
    let scope = ScopeKey::from("inv-1");

    engine.on_tool_result(&scope, "tool_a", ToolOutcome::exception("a"));
    engine.on_tool_result(&scope, "tool_a", ToolOutcome::exception("a"));
    engine.on_tool_result(&scope, "tool_a", ToolOutcome::exception("a"));
    assert!(engine.is_exhausted(&scope, "tool_a"));

    assert_eq!(engine.failure_count(&scope, "tool_b"), 0);
    assert!(
        engine
            .on_tool_result(&scope, "tool_b", ToolOutcome::exception("b"))
            .is_retry()
    );
}

#[test]
fn per_invocation_scopes_do_not_leak_across_invocations() {
    let engine = engine(1);
    let first = engine.resolve_scope_key(&ScopeContext::new("inv-1"));
    let second = engine.resolve_scope_key(&ScopeContext::new("inv-2"));
    assert_ne!(first, second);

    engine.on_tool_result(&first, "search", ToolOutcome::exception("down"));
    engine.on_tool_result(&first, "search", ToolOutcome::exception("down"));
    assert!(engine.is_exhausted(&first, "search"));

    // Same tool in a fresh invocation starts from zero.
    assert!(
        engine
            .on_tool_result(&second, "search", ToolOutcome::exception("down"))
            .is_retry()
    );
}

#[test]
fn global_tracking_accumulates_across_invocations() {
    let engine = RetryDecisionEngine::new(RetryConfig {
        max_retries: 2,
        tracking_scope: ScopeMode::Global,
        ..RetryConfig::default()
    });

    let first = engine.resolve_scope_key(&ScopeContext::new("inv-1"));
    let second = engine.resolve_scope_key(&ScopeContext::new("inv-2"));
    assert_eq!(first, second);

    assert!(
        engine
            .on_tool_result(&first, "search", ToolOutcome::exception("down"))
            .is_retry()
    );
    assert!(
        engine
            .on_tool_result(&second, "search", ToolOutcome::exception("down"))
            .is_retry()
    );
    assert!(
        engine
            .on_tool_result(&second, "search", ToolOutcome::exception("down"))
            .is_give_up()
    );
}

#[test]
fn custom_scope_groups_by_user() {
    let engine = engine(1).with_tracking_scope(TrackingScope::custom(|ctx: &ScopeContext| {
        ScopeKey::new(format!("user:{}", ctx.user_id.as_deref().unwrap_or("-")))
    }));

    let alice_inv1 = engine.resolve_scope_key(&ScopeContext::new("inv-1").with_user("alice"));
    let alice_inv2 = engine.resolve_scope_key(&ScopeContext::new("inv-2").with_user("alice"));
    let bob = engine.resolve_scope_key(&ScopeContext::new("inv-3").with_user("bob"));
    assert_eq!(alice_inv1, alice_inv2);
    assert_ne!(alice_inv1, bob);

    engine.on_tool_result(&alice_inv1, "search", ToolOutcome::exception("down"));
    engine.on_tool_result(&alice_inv2, "search", ToolOutcome::exception("down"));
    assert!(engine.is_exhausted(&alice_inv1, "search"));
    assert!(!engine.is_exhausted(&bob, "search"));
}

// The guess-the-number scenario: far-off guesses raise, near misses come
// back as successful-looking results with an error status. Whether the
// near miss consumes retry budget depends entirely on the extractor.
#[test]
fn near_miss_counts_as_failure_with_status_extractor() {
    let engine = engine(3).with_error_extractor(json_status_error("status", "error"));
    let scope = ScopeKey::from("inv-1");

    for guess in ["50", "25", "10"] {
        let outcome = ToolOutcome::Exception(ErrorDescription::new(format!(
            "Number {guess} is too large."
        )));
        assert!(engine.on_tool_result(&scope, "guess_number", outcome).is_retry());
    }

    // Fourth consecutive failure, flagged by the extractor this time.
    let near_miss =
        ToolOutcome::success(json!({"status": "error", "error_message": "Number is almost valid."}));
    assert!(
        engine
            .on_tool_result(&scope, "guess_number", near_miss)
            .is_give_up()
    );
}

#[test]
fn near_miss_is_accepted_without_an_extractor() {
    let engine = engine(3);
    let scope = ScopeKey::from("inv-1");

    for _ in 0..3 {
        engine.on_tool_result(
            &scope,
            "guess_number",
            ToolOutcome::exception("Number is too large."),
        );
    }

    let near_miss =
        ToolOutcome::success(json!({"status": "error", "error_message": "Number is almost valid."}));
    let decision = engine.on_tool_result(&scope, "guess_number", near_miss);
    assert!(decision.is_accept());

    // The structurally successful result also reset the counter, so the
    // run can keep going without exhausting the budget.
    assert_eq!(engine.failure_count(&scope, "guess_number"), 0);
}

#[test]
fn explicit_reset_reopens_an_exhausted_pair() {
    let engine = engine(1);
    let scope = ScopeKey::from("inv-1");

    engine.on_tool_result(&scope, "search", ToolOutcome::exception("down"));
    engine.on_tool_result(&scope, "search", ToolOutcome::exception("down"));
    assert!(engine.is_exhausted(&scope, "search"));

    engine.reset(&scope, "search");
    assert!(!engine.is_exhausted(&scope, "search"));
    assert!(
        engine
            .on_tool_result(&scope, "search", ToolOutcome::exception("down"))
            .is_retry()
    );
}
