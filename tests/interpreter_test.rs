use jstrace::interpreter::{GuardLimit, GuardLimits, Interpreter};
use jstrace::parser::parse;
use jstrace::runtime::Value;
use jstrace::trace::{Breakpoint, StepKind};

fn run(source: &str) -> (Interpreter, Vec<jstrace::ExecutionStep>) {
    let program = parse(source).expect("parse failed");
    let mut interpreter = Interpreter::new(GuardLimits::default());
    let steps = interpreter.execute(&program);
    (interpreter, steps)
}

#[test]
fn test_arithmetic_and_console() {
    let (interpreter, steps) = run(r#"
        let x = 2 + 3 * 4;
        console.log(x);
        console.log("x is", x);
    "#);
    assert_eq!(interpreter.console_output(), &["14", "x is 14"]);
    assert!(!steps.is_empty());
    assert!(interpreter.guard_exceeded().is_none());
}

#[test]
fn test_step_indices_are_strictly_ordered() {
    let (_, steps) = run("let a = 1; let b = 2; let c = a + b; console.log(c);");
    for (i, step) in steps.iter().enumerate() {
        assert_eq!(step.index, i);
    }
}

#[test]
fn test_primitive_copies_are_independent() {
    let (_, steps) = run(r#"
        let a = 1;
        let b = a;
        a = 2;
    "#);
    let last = steps.last().unwrap();
    assert_eq!(last.resolve("a"), Some(&Value::Number(2.0)));
    assert_eq!(last.resolve("b"), Some(&Value::Number(1.0)));
}

#[test]
fn test_composites_alias_through_the_heap() {
    let (_, steps) = run(r#"
        let arr = [1, 2, 3];
        let alias = arr;
        alias.push(4);
    "#);
    let last = steps.last().unwrap();
    let arr = last.resolve("arr").unwrap();
    let alias = last.resolve("alias").unwrap();
    assert_eq!(arr, alias);

    let address = match arr {
        Value::Array(address) => *address,
        other => panic!("expected array, got {:?}", other),
    };
    let object = last.heap_object(address).expect("heap object missing");
    match &object.value {
        jstrace::trace::HeapValueSnapshot::Array { elements } => {
            assert_eq!(elements.len(), 4);
            assert_eq!(elements[3], Value::Number(4.0));
        }
        other => panic!("expected array snapshot, got {:?}", other),
    }
}

#[test]
fn test_object_mutation_is_visible_through_both_names() {
    let (interpreter, _) = run(r#"
        let a = { count: 0 };
        let b = a;
        b.count = 10;
        console.log(a.count);
    "#);
    assert_eq!(interpreter.console_output(), &["10"]);
}

#[test]
fn test_var_hoisting_reads_undefined_before_assignment() {
    let (interpreter, _) = run(r#"
        console.log(x);
        var x = 5;
        console.log(x);
    "#);
    assert_eq!(interpreter.console_output(), &["undefined", "5"]);
}

#[test]
fn test_function_hoisting_allows_early_call() {
    let (interpreter, _) = run(r#"
        console.log(double(4));
        function double(n) { return n * 2; }
    "#);
    assert_eq!(interpreter.console_output(), &["8"]);
}

#[test]
fn test_let_loop_variable_captured_per_iteration() {
    let (interpreter, _) = run(r#"
        let fns = [];
        for (let i = 0; i < 3; i++) {
            fns.push(function () { return i; });
        }
        console.log(fns[0](), fns[1](), fns[2]());
    "#);
    assert_eq!(interpreter.console_output(), &["0 1 2"]);
}

#[test]
fn test_var_loop_variable_is_shared() {
    let (interpreter, _) = run(r#"
        let fns = [];
        for (var i = 0; i < 3; i++) {
            fns.push(function () { return i; });
        }
        console.log(fns[0](), fns[1](), fns[2]());
    "#);
    assert_eq!(interpreter.console_output(), &["3 3 3"]);
}

#[test]
fn test_closure_keeps_captured_scope_alive() {
    let (interpreter, _) = run(r#"
        function makeCounter() {
            let count = 0;
            return function () {
                count++;
                return count;
            };
        }
        let inc = makeCounter();
        console.log(inc());
        console.log(inc());
        console.log(inc());
    "#);
    assert_eq!(interpreter.console_output(), &["1", "2", "3"]);
}

#[test]
fn test_step_limit_truncates_at_exactly_max_steps() {
    let program = parse("while (true) {}").unwrap();
    let mut interpreter = Interpreter::new(GuardLimits {
        max_steps: 50,
        ..GuardLimits::default()
    });
    let steps = interpreter.execute(&program);
    assert_eq!(steps.len(), 50);
    assert_eq!(interpreter.guard_exceeded(), Some(GuardLimit::Steps));
}

#[test]
fn test_loop_iteration_guard() {
    let program = parse("let i = 0; while (i < 100) { i++; }").unwrap();
    let mut interpreter = Interpreter::new(GuardLimits {
        max_loop_iterations: 10,
        ..GuardLimits::default()
    });
    let steps = interpreter.execute(&program);
    assert_eq!(
        interpreter.guard_exceeded(),
        Some(GuardLimit::LoopIterations)
    );
    assert_eq!(steps.last().unwrap().kind, StepKind::Error);
}

#[test]
fn test_call_depth_guard() {
    let (interpreter, steps) = run("function f() { return f(); } f();");
    assert_eq!(interpreter.guard_exceeded(), Some(GuardLimit::CallDepth));
    assert_eq!(steps.last().unwrap().kind, StepKind::Error);
}

#[test]
fn test_parse_failure_for_malformed_declaration() {
    assert!(parse("let = ;").is_err());
}

#[test]
fn test_break_outside_a_loop_is_a_parse_error() {
    assert!(parse("break;").is_err());
    assert!(parse("continue;").is_err());
    assert!(parse("while (true) { break; }").is_ok());
}

#[test]
fn test_out_of_range_index_reads_undefined_and_drops_writes() {
    let (interpreter, _) = run(r#"
        let a = [7, 8];
        let x = a[-1];
        a[-1] = 99;
        console.log(x, a[0], a.length);
        console.log(a[0.5], "s"[-1]);
    "#);
    assert_eq!(
        interpreter.console_output(),
        &["undefined 7 2", "undefined undefined"]
    );
}

#[test]
fn test_collections_treat_nan_as_one_value() {
    let (interpreter, _) = run(r#"
        let s = new Set([NaN, NaN]);
        console.log(s.size, s.has(NaN));
        let m = new Map();
        m.set(NaN, "n");
        m.set(NaN, "nn");
        console.log(m.get(NaN), m.size);
        console.log([NaN].includes(NaN), [NaN].indexOf(NaN));
    "#);
    assert_eq!(
        interpreter.console_output(),
        &["1 true", "nn 1", "true -1"]
    );
}

#[test]
fn test_traces_are_deterministic() {
    let source = r#"
        let data = [3, 1, 2];
        data.push(4);
        let doubled = data.map(n => n * 2);
        console.log(doubled.join("-"));
        let m = new Map();
        m.set("a", 1);
        console.log(m.get("a"), m.size);
    "#;
    let program = parse(source).unwrap();

    let mut first = Interpreter::new(GuardLimits::default());
    let trace_a = first.execute(&program);
    let mut second = Interpreter::new(GuardLimits::default());
    let trace_b = second.execute(&program);

    let json_a = serde_json::to_string(&trace_a).unwrap();
    let json_b = serde_json::to_string(&trace_b).unwrap();
    assert_eq!(json_a, json_b);
}

#[test]
fn test_calling_a_non_function_becomes_an_error_step() {
    let (interpreter, steps) = run(r#"
        console.log("before");
        missing();
        console.log("after");
    "#);
    let last = steps.last().unwrap();
    assert_eq!(last.kind, StepKind::Error);
    assert!(last.description.contains("not a function"));
    // Steps before the fault survive
    assert_eq!(interpreter.console_output(), &["before"]);
}

#[test]
fn test_reading_through_null_becomes_an_error_step() {
    let (_, steps) = run("let x = null; x.field;");
    let last = steps.last().unwrap();
    assert_eq!(last.kind, StepKind::Error);
    assert!(last.description.contains("Cannot read properties"));
}

#[test]
fn test_reduce_of_empty_array_without_initial_value() {
    let (_, steps) = run("[].reduce((a, b) => a + b);");
    let last = steps.last().unwrap();
    assert_eq!(last.kind, StepKind::Error);
    assert!(last.description.contains("Reduce of empty array"));
}

#[test]
fn test_array_higher_order_methods() {
    let (interpreter, _) = run(r#"
        let nums = [1, 2, 3, 4, 5];
        let evens = nums.filter(n => n % 2 === 0);
        let sum = nums.reduce((acc, n) => acc + n, 0);
        console.log(evens.join(","), sum);
        console.log(nums.find(n => n > 3), nums.findIndex(n => n > 3));
        console.log(nums.some(n => n > 4), nums.every(n => n > 0));
    "#);
    assert_eq!(
        interpreter.console_output(),
        &["2,4 15", "4 3", "true true"]
    );
}

#[test]
fn test_array_mutating_methods_record_heap_mutations() {
    let (_, steps) = run("let a = [1]; a.push(2); a.pop(); a.unshift(0);");
    let mutations = steps
        .iter()
        .filter(|step| step.kind == StepKind::HeapMutation)
        .count();
    assert_eq!(mutations, 3);
}

#[test]
fn test_string_methods() {
    let (interpreter, _) = run(r#"
        let s = "Hello, World";
        console.log(s.toUpperCase());
        console.log(s.slice(0, 5), s.substring(7, 12));
        console.log(s.indexOf("World"), s.includes("lo"), s.split(", ").length);
        console.log("5".padStart(3, "0"), "ab".repeat(3));
    "#);
    assert_eq!(
        interpreter.console_output(),
        &["HELLO, WORLD", "Hello World", "7 true 2", "005 ababab"]
    );
}

#[test]
fn test_map_and_set() {
    let (interpreter, _) = run(r#"
        let m = new Map();
        m.set("one", 1);
        m.set("two", 2);
        m.set("one", 11);
        console.log(m.get("one"), m.size, m.has("three"));
        let s = new Set([1, 2, 2, 3]);
        s.add(4);
        s.add(1);
        console.log(s.size, s.has(2));
        s.delete(2);
        console.log(s.size, s.has(2));
    "#);
    assert_eq!(
        interpreter.console_output(),
        &["11 2 false", "4 true", "3 false"]
    );
}

#[test]
fn test_for_of_over_array_and_string() {
    let (interpreter, _) = run(r#"
        let total = 0;
        for (const n of [1, 2, 3]) {
            total += n;
        }
        console.log(total);
        let letters = [];
        for (const c of "abc") {
            letters.push(c);
        }
        console.log(letters.join(""));
    "#);
    assert_eq!(interpreter.console_output(), &["6", "abc"]);
}

#[test]
fn test_default_parameters() {
    let (interpreter, _) = run(r#"
        function greet(name = "world") {
            return "hi " + name;
        }
        console.log(greet());
        console.log(greet("there"));
    "#);
    assert_eq!(interpreter.console_output(), &["hi world", "hi there"]);
}

#[test]
fn test_arrow_functions_and_ternary() {
    let (interpreter, _) = run(r#"
        const sign = n => n < 0 ? "neg" : n > 0 ? "pos" : "zero";
        console.log(sign(-5), sign(3), sign(0));
    "#);
    assert_eq!(interpreter.console_output(), &["neg pos zero"]);
}

#[test]
fn test_branch_and_loop_steps_recorded() {
    let (_, steps) = run(r#"
        let n = 0;
        if (n === 0) { n = 1; }
        while (n < 3) { n++; }
    "#);
    assert!(steps.iter().any(|step| step.kind == StepKind::Branch));
    assert!(steps.iter().any(|step| step.kind == StepKind::LoopStart));
    assert!(steps
        .iter()
        .any(|step| step.kind == StepKind::LoopIteration));
    assert!(steps.iter().any(|step| step.kind == StepKind::LoopEnd));
}

#[test]
fn test_call_and_return_steps_snapshot_the_stack() {
    let (_, steps) = run(r#"
        function inner() { return 1; }
        function outer() { return inner() + 1; }
        outer();
    "#);
    let deepest = steps
        .iter()
        .map(|step| step.call_stack.len())
        .max()
        .unwrap();
    // global frame + outer + inner
    assert_eq!(deepest, 3);

    let call = steps
        .iter()
        .find(|step| step.kind == StepKind::Call && step.description.contains("inner"))
        .unwrap();
    assert_eq!(call.call_stack[0].name, "global");
    assert_eq!(call.call_stack[1].name, "outer");
    assert_eq!(call.call_stack[2].name, "inner");
}

#[test]
fn test_breakpoints_flag_pause_points() {
    let program = parse("let x = 1;\nlet y = 2;\nlet z = 3;").unwrap();
    let mut interpreter = Interpreter::new(GuardLimits::default());
    interpreter.set_breakpoints(&[Breakpoint { line: 2 }]);
    let steps = interpreter.execute(&program);

    for step in &steps {
        assert_eq!(step.pause_point, step.location.line == 2);
    }
    assert!(steps.iter().any(|step| step.pause_point));
}

#[test]
fn test_execute_replaces_previous_trace() {
    let mut interpreter = Interpreter::new(GuardLimits::default());
    let first = parse("console.log(\"a\");").unwrap();
    let second = parse("console.log(\"b\");").unwrap();

    interpreter.execute(&first);
    let steps = interpreter.execute(&second);

    assert_eq!(interpreter.console_output(), &["b"]);
    assert_eq!(steps[0].index, 0);
}

#[test]
fn test_console_delta_is_attached_to_the_logging_step() {
    let (_, steps) = run("let x = 1; console.log(x); let y = 2;");
    let console_step = steps
        .iter()
        .find(|step| step.kind == StepKind::Console)
        .unwrap();
    assert_eq!(console_step.console_delta, &["1"]);
    for step in steps.iter().filter(|step| step.kind != StepKind::Console) {
        assert!(step.console_delta.is_empty());
    }
}

#[test]
fn test_typeof_and_equality() {
    let (interpreter, _) = run(r#"
        console.log(typeof 1, typeof "a", typeof true, typeof undefined);
        console.log(1 == "1", 1 === "1", null == undefined, null === undefined);
    "#);
    assert_eq!(
        interpreter.console_output(),
        &["number string boolean undefined", "true false true false"]
    );
}

#[test]
fn test_block_scoped_shadowing() {
    let (interpreter, _) = run(r#"
        let x = "outer";
        {
            let x = "inner";
            console.log(x);
        }
        console.log(x);
    "#);
    assert_eq!(interpreter.console_output(), &["inner", "outer"]);
}
