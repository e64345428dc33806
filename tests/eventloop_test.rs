use jstrace::eventloop::{analyze_event_loop, Phase, WarningKind};

#[test]
fn test_sync_then_micro_then_macro_ordering() {
    let trace = analyze_event_loop(
        r#"console.log("1");
setTimeout(() => { console.log("timeout"); }, 0);
Promise.resolve().then(() => { console.log("promise"); });
console.log("2");"#,
    )
    .unwrap();
    assert_eq!(trace.final_output(), &["1", "2", "promise", "timeout"]);
}

#[test]
fn test_sync_only_script() {
    let trace = analyze_event_loop(
        r#"console.log("a");
console.log("b");"#,
    )
    .unwrap();
    assert_eq!(trace.final_output(), &["a", "b"]);
    assert!(trace
        .steps
        .iter()
        .all(|step| step.phase == Phase::Sync || step.phase == Phase::Idle));
}

#[test]
fn test_script_frame_and_final_idle() {
    let trace = analyze_event_loop("console.log(\"hi\");").unwrap();

    let first = trace.steps.first().unwrap();
    assert_eq!(first.phase, Phase::Sync);
    assert_eq!(first.call_stack, &["<script>"]);

    let last = trace.steps.last().unwrap();
    assert_eq!(last.phase, Phase::Idle);
    assert!(last.microtasks.is_empty());
    assert!(last.macrotasks.is_empty());
}

#[test]
fn test_code_lines_are_zero_based_and_absent_for_bookkeeping() {
    let trace = analyze_event_loop(
        r#"console.log("one");
console.log("two");"#,
    )
    .unwrap();

    // Opening bookkeeping step has no source line
    assert_eq!(trace.steps[0].code_line, None);
    assert_eq!(trace.steps[1].code_line, Some(0));
    assert_eq!(trace.steps[2].code_line, Some(1));
    assert_eq!(trace.steps.last().unwrap().code_line, None);
}

#[test]
fn test_timer_delays_order_macrotasks() {
    let trace = analyze_event_loop(
        r#"setTimeout(() => { console.log("slow"); }, 100);
setTimeout(() => { console.log("fast"); }, 0);
console.log("sync");"#,
    )
    .unwrap();
    assert_eq!(trace.final_output(), &["sync", "fast", "slow"]);
}

#[test]
fn test_equal_delays_keep_scheduling_order() {
    let trace = analyze_event_loop(
        r#"setTimeout(() => { console.log("first"); }, 0);
setTimeout(() => { console.log("second"); }, 0);"#,
    )
    .unwrap();
    assert_eq!(trace.final_output(), &["first", "second"]);
}

#[test]
fn test_microtasks_drain_before_macrotasks() {
    let trace = analyze_event_loop(
        r#"setTimeout(() => { console.log("macro"); }, 0);
queueMicrotask(() => { console.log("micro"); });"#,
    )
    .unwrap();
    assert_eq!(trace.final_output(), &["micro", "macro"]);

    let micro_index = trace
        .steps
        .iter()
        .position(|step| step.phase == Phase::Micro)
        .unwrap();
    let macro_index = trace
        .steps
        .iter()
        .position(|step| step.phase == Phase::Macro)
        .unwrap();
    assert!(micro_index < macro_index);
}

#[test]
fn test_microtask_queued_during_drain_runs_in_the_same_drain() {
    let trace = analyze_event_loop(
        r#"queueMicrotask(() => {
    console.log("m1");
    queueMicrotask(() => { console.log("m2"); });
});
setTimeout(() => { console.log("t"); }, 0);
console.log("s");"#,
    )
    .unwrap();
    assert_eq!(trace.final_output(), &["s", "m1", "m2", "t"]);
}

#[test]
fn test_promise_chain_runs_callbacks_in_order() {
    let trace = analyze_event_loop(
        r#"Promise.resolve().then(() => { console.log("a"); }).then(() => { console.log("b"); });
setTimeout(() => { console.log("t"); }, 0);"#,
    )
    .unwrap();
    assert_eq!(trace.final_output(), &["a", "b", "t"]);
}

#[test]
fn test_promise_scheduled_inside_a_macrotask_runs_before_the_next_macrotask() {
    let trace = analyze_event_loop(
        r#"setTimeout(() => {
    console.log("timeout 1");
    Promise.resolve().then(() => { console.log("promise in timeout"); });
}, 0);
setTimeout(() => { console.log("timeout 2"); }, 0);"#,
    )
    .unwrap();
    assert_eq!(
        trace.final_output(),
        &["timeout 1", "promise in timeout", "timeout 2"]
    );
}

#[test]
fn test_timeout_scheduled_inside_a_timeout() {
    let trace = analyze_event_loop(
        r#"setTimeout(() => {
    console.log("outer");
    setTimeout(() => { console.log("inner"); }, 0);
}, 0);"#,
    )
    .unwrap();
    assert_eq!(trace.final_output(), &["outer", "inner"]);
}

#[test]
fn test_named_function_as_timer_callback() {
    let trace = analyze_event_loop(
        r#"function sayHi() { console.log("hi"); }
setTimeout(sayHi, 0);
console.log("first");"#,
    )
    .unwrap();
    assert_eq!(trace.final_output(), &["first", "hi"]);
}

#[test]
fn test_queue_snapshots_show_pending_callbacks() {
    let trace = analyze_event_loop(
        r#"Promise.resolve().then(() => { console.log("p"); });
setTimeout(() => { console.log("t"); }, 0);"#,
    )
    .unwrap();

    let then_step = trace
        .steps
        .iter()
        .find(|step| step.description.contains(".then callback is queued"))
        .unwrap();
    assert_eq!(then_step.microtasks, &["promise cb"]);

    let timeout_step = trace
        .steps
        .iter()
        .find(|step| step.description.starts_with("setTimeout called"))
        .unwrap();
    assert_eq!(timeout_step.macrotasks, &["timeout cb"]);
}

#[test]
fn test_promise_combinator_warning() {
    let trace = analyze_event_loop("Promise.all([a, b]);").unwrap();
    assert!(trace
        .warnings
        .iter()
        .any(|warning| warning.kind == WarningKind::PromiseCombinator));
}

#[test]
fn test_unmodeled_constructs_each_get_a_warning() {
    let trace = analyze_event_loop(
        r#"Promise.reject("boom");
p.catch(handler);
setInterval(tick, 100);
fetch("/api");
new Promise((resolve) => { resolve(1); });"#,
    )
    .unwrap();

    let kinds: Vec<WarningKind> = trace.warnings.iter().map(|warning| warning.kind).collect();
    assert!(kinds.contains(&WarningKind::PromiseReject));
    assert!(kinds.contains(&WarningKind::CatchHandler));
    assert!(kinds.contains(&WarningKind::SetInterval));
    assert!(kinds.contains(&WarningKind::Fetch));
    assert!(kinds.contains(&WarningKind::PromiseConstructor));
}

#[test]
fn test_warning_lines_are_zero_based() {
    let trace = analyze_event_loop(
        r#"console.log("x");
setInterval(tick, 100);"#,
    )
    .unwrap();
    let warning = trace
        .warnings
        .iter()
        .find(|warning| warning.kind == WarningKind::SetInterval)
        .unwrap();
    assert_eq!(warning.line, Some(1));
}

#[test]
fn test_clean_scripts_produce_no_warnings() {
    let trace = analyze_event_loop(
        r#"console.log("1");
setTimeout(() => { console.log("t"); }, 0);
Promise.resolve().then(() => { console.log("p"); });"#,
    )
    .unwrap();
    assert!(trace.warnings.is_empty());
}

#[test]
fn test_timer_bound_to_a_declaration_still_schedules() {
    let trace = analyze_event_loop(
        r#"const t = setTimeout(() => { console.log("timeout"); }, 0);
console.log("sync");"#,
    )
    .unwrap();
    assert_eq!(trace.final_output(), &["sync", "timeout"]);
    assert!(trace.warnings.is_empty());
}

#[test]
fn test_promise_chain_bound_to_a_declaration_still_schedules() {
    let trace = analyze_event_loop(
        r#"const p = Promise.resolve().then(() => { console.log("promise"); });
setTimeout(() => { console.log("timeout"); }, 0);"#,
    )
    .unwrap();
    assert_eq!(trace.final_output(), &["promise", "timeout"]);
}

#[test]
fn test_declaration_inside_a_callback_body_still_schedules() {
    let trace = analyze_event_loop(
        r#"setTimeout(() => {
    const q = Promise.resolve().then(() => { console.log("inner"); });
    console.log("outer");
}, 0);"#,
    )
    .unwrap();
    assert_eq!(trace.final_output(), &["outer", "inner"]);
}

#[test]
fn test_parse_errors_propagate() {
    assert!(analyze_event_loop("let = ;").is_err());
}

#[test]
fn test_output_is_cumulative_across_steps() {
    let trace = analyze_event_loop(
        r#"console.log("a");
console.log("b");"#,
    )
    .unwrap();
    let mut previous = 0;
    for step in &trace.steps {
        assert!(step.output.len() >= previous);
        assert_eq!(&step.output[..previous], &trace.final_output()[..previous]);
        previous = step.output.len();
    }
}
