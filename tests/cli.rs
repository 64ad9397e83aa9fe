use assert_cmd::Command;
use std::io::Write;

fn loxide() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("loxide"))
}

#[test]
fn runs_file_successfully() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "print \"hello\";").unwrap();

    loxide().arg(file.path()).assert().success();
}

#[test]
fn evaluates_expression_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "print (1 + 2);").unwrap();

    loxide()
        .arg(file.path())
        .assert()
        .success()
        .stdout(predicates::str::contains("3"));
}

#[test]
fn prints_usage_with_too_many_args() {
    loxide()
        .args(["one.lox", "two.lox"])
        .assert()
        .code(64)
        .stderr(predicates::str::contains("Usage: loxide"));
}

#[test]
fn exits_with_error_for_missing_file() {
    loxide()
        .arg("no_such_script.lox")
        .assert()
        .code(65)
        .stderr(predicates::str::contains("Could not read script"));
}

#[test]
fn file_with_syntax_error_exits_65() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "print 42").unwrap();

    loxide()
        .arg(file.path())
        .assert()
        .code(65)
        .stderr(predicates::str::contains("Expect ';' after value."));
}

#[test]
fn file_reports_multiple_syntax_errors_in_one_pass() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "var = 1;").unwrap();
    writeln!(file, "print ;").unwrap();

    loxide()
        .arg(file.path())
        .assert()
        .code(65)
        .stderr(predicates::str::contains("Expect variable name."))
        .stderr(predicates::str::contains("Expect expression."));
}

#[test]
fn file_with_runtime_error_exits_65() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "var x = \"text\";").unwrap();
    writeln!(file, "print -x;").unwrap();

    loxide()
        .arg(file.path())
        .assert()
        .code(65)
        .stderr(predicates::str::contains("Operand must be a number."));
}

#[test]
fn file_with_resolution_error_does_not_execute() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "print \"before\";").unwrap();
    writeln!(file, "{{ var a = a; }}").unwrap();

    loxide()
        .arg(file.path())
        .assert()
        .code(65)
        .stdout(predicates::str::is_empty())
        .stderr(predicates::str::contains(
            "Cannot read local variable in its own initializer.",
        ));
}

#[test]
fn unused_variable_warns_but_run_succeeds() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "{{ var unused = 1; print \"done\"; }}").unwrap();

    loxide()
        .arg(file.path())
        .assert()
        .success()
        .stdout(predicates::str::contains("done"))
        .stderr(predicates::str::contains("never used"));
}

#[test]
fn error_report_names_the_file() {
    let mut file = tempfile::NamedTempFile::with_suffix(".lox").unwrap();
    writeln!(file, "print 42").unwrap();

    let filename = file.path().to_string_lossy().to_string();
    loxide()
        .arg(file.path())
        .assert()
        .code(65)
        .stderr(predicates::str::contains(filename));
}

#[test]
fn class_program_runs_end_to_end() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        "class A {{ greet() {{ return \"A\"; }} }}\n\
         class B < A {{ greet() {{ return super.greet() + \"B\"; }} }}\n\
         print B().greet();"
    )
    .unwrap();

    loxide()
        .arg(file.path())
        .assert()
        .success()
        .stdout(predicates::str::contains("AB"));
}

// === REPL over piped stdin ===

#[test]
fn repl_exits_on_eof() {
    // With empty piped stdin, rustyline sees EOF immediately
    loxide().write_stdin("").assert().success();
}

#[test]
fn repl_evaluates_statement() {
    loxide()
        .write_stdin("print 1 + 2;\n")
        .assert()
        .success()
        .stdout(predicates::str::contains("3"));
}

#[test]
fn repl_auto_prints_bare_expressions() {
    loxide()
        .write_stdin("1 + 2\n")
        .assert()
        .success()
        .stdout(predicates::str::contains("3"));
}

#[test]
fn repl_state_persists_between_lines() {
    loxide()
        .write_stdin("var x = 21;\nprint x * 2;\n")
        .assert()
        .success()
        .stdout(predicates::str::contains("42"));
}

#[test]
fn repl_accepts_multiline_block() {
    loxide()
        .write_stdin("{\nprint 42;\n}\n")
        .assert()
        .success()
        .stdout(predicates::str::contains("42"));
}

#[test]
fn repl_reports_errors_and_keeps_going() {
    loxide()
        .write_stdin("@\nprint 1 + 2;\n")
        .assert()
        .code(65)
        .stdout(predicates::str::contains("3"))
        .stderr(predicates::str::contains("Unexpected character '@'."));
}
