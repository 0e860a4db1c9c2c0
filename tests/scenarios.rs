use fita::{compile, DiagnosticKind, HaltReason, Machine, Status, VIRTUAL_START};

fn program(input: &str, tapes: usize, rules: &str) -> String {
    format!(
        "[Descricao]\n    Nome = Scenario\n[Parametros]\n    AlfabetoEntrada = {{ {input} }}\n\
         \x20   AlfabetoAuxiliar = {{}}\n    Estados = {{ q0, q1 }}\n    EstadoInicial = q0\n\
         \x20   EstadosTerminais = {{ q1 }}\n    NumeroFitas = {tapes}\n[Programa]\n{rules}\n"
    )
}

#[test]
fn single_step_accepts() {
    let config = compile(&program("a, b", 1, "    q0, a = q1, a, P")).unwrap();
    let mut machine = Machine::new(config).unwrap();

    machine.reset("a").unwrap();
    assert_eq!(machine.step(), Status::Accepted);
    assert_eq!(machine.state(), "q1");
    assert_eq!(machine.step_count(), 1);
}

#[test]
fn missing_rule_rejects() {
    let config = compile(&program("a, b", 1, "    q0, a = q1, a, P")).unwrap();
    let mut machine = Machine::new(config).unwrap();

    machine.reset("b").unwrap();
    assert_eq!(machine.step(), Status::Rejected);
    assert_eq!(machine.halt_reason(), Some(HaltReason::NoTransition));
}

#[test]
fn two_heads_advance_in_lockstep() {
    let rules = "    q0, a, _ = q0, _, a, D, D\n    q0, _, _ = q1, _, _, P, P";
    let config = compile(&program("a", 2, rules)).unwrap();

    for k in 0..6 {
        let mut machine = Machine::new(config.clone()).unwrap();
        machine.reset(&"a".repeat(k)).unwrap();

        for _ in 0..k {
            assert_eq!(machine.step(), Status::Running);
        }
        let offset = i32::try_from(k).unwrap();
        assert_eq!(machine.heads(), &[VIRTUAL_START + offset, VIRTUAL_START + offset]);
        assert_eq!(machine.step(), Status::Accepted);
    }
}

#[test]
fn missing_section_stops_compilation() {
    let text = "[Descricao]\n    Nome = x\n[Programa]\n    q0, a = q1, a, P\n";
    let report = compile(text).unwrap_err();

    assert_eq!(report.len(), 1);
    assert!(report.contains(&DiagnosticKind::MissingSection("Parametros")));
    assert_eq!(report.to_string(), "- section not found: Parametros");
}

#[test]
fn escaped_symbols_in_alphabet() {
    let config = compile(&program("a, $v, $e", 1, "")).unwrap();
    let input: Vec<char> = config.alphabet().input().chars().collect();

    assert_eq!(input, vec![' ', ',', 'a']);
}

#[test]
fn snapshots_stream_as_json() {
    let config = compile(&program("a", 1, "    q0, a = q0, a, D\n    q0, _ = q1, _, P")).unwrap();
    let mut machine = Machine::new(config).unwrap();
    let lines = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));
    let sink = std::rc::Rc::clone(&lines);
    machine.subscribe(move |s: &fita::Snapshot| {
        sink.borrow_mut().push(serde_json::to_string(s).unwrap())
    });

    machine.reset("aa").unwrap();
    machine.run();

    let lines = lines.borrow();
    assert_eq!(lines.len(), 4);
    assert!(lines[0].contains("\"status\":\"Running\""));
    assert!(lines[3].contains("\"status\":\"Accepted\""));
}
