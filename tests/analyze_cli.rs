//! End-to-end runs of the analyzer binary against a mock LM command.
#![cfg(unix)]

mod common;

use common::{mock_lm_command, stderr, stdout, Workspace};

fn json_summary(output: &std::process::Output) -> serde_json::Value {
    serde_json::from_str(&stdout(output)).expect("stdout is a JSON summary")
}

#[test]
fn full_run_writes_report_with_metadata_header() {
    let ws = Workspace::new().expect("workspace");
    let lm = mock_lm_command();
    let document = ws.document();
    let output = ws
        .run(&[
            "analyze",
            document.to_str().unwrap(),
            "--name",
            "Atlas",
            "--lm",
            &lm,
        ])
        .expect("run analyzer");

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let err = stderr(&output);
    assert!(err.contains("✓ Main analysis complete"));
    assert!(err.contains("✓ Assumption extraction complete"));
    assert!(err.contains("✓ Report generation complete"));

    let out = stdout(&output);
    assert!(out.contains("Scope clarity score: 72/100"), "stdout: {out}");
    assert!(out.contains("Overall risk level: HIGH"), "stdout: {out}");
    assert!(out.contains("Stages completed: 7"));
    assert!(!out.contains("Failed stages"));

    let reports = ws.default_reports();
    assert_eq!(reports.len(), 1, "expected one report in reports/");
    let report = std::fs::read_to_string(&reports[0]).expect("read report");
    assert!(report.starts_with("# Project Scope Analysis Report\n\n**Project:** Atlas\n"));
    assert!(report.contains("**Scope Clarity Score:** 72/100\n"));
    assert!(report.contains("**Overall Risk Level:** HIGH\n"));
    assert!(report.contains("Mock report with a critical dependency"));
}

#[test]
fn quick_run_only_runs_main_analysis() {
    let ws = Workspace::new().expect("workspace");
    let lm = mock_lm_command();
    let document = ws.document();
    let output = ws
        .run(&[
            "analyze",
            document.to_str().unwrap(),
            "--quick",
            "--json",
            "--output",
            "out/quick.md",
            "--lm",
            &lm,
        ])
        .expect("run analyzer");

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let summary = json_summary(&output);
    let keys: Vec<&String> = summary["results"]
        .as_object()
        .expect("results object")
        .keys()
        .collect();
    assert_eq!(keys, vec!["main_analysis"]);
    assert_eq!(summary["stages_completed"], 1);
    assert_eq!(summary["stages"], serde_json::json!(["main_analysis"]));
    assert_eq!(summary["score"], 72);
    assert_eq!(summary["risk_level"], "LOW");
    assert_eq!(summary["report_path"], "out/quick.md");
    assert!(ws.path().join("out/quick.md").is_file());
}

#[test]
fn explicit_stage_list_runs_in_fixed_order() {
    let ws = Workspace::new().expect("workspace");
    let lm = mock_lm_command();
    let document = ws.document();
    let output = ws
        .run(&[
            "analyze",
            document.to_str().unwrap(),
            "--stages",
            "assumptions,risk_assessment",
            "--json",
            "--lm",
            &lm,
        ])
        .expect("run analyzer");

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let err = stderr(&output);
    let risk = err.find("✓ Risk assessment complete").expect("risk stage ran");
    let assumptions = err
        .find("✓ Assumption extraction complete")
        .expect("assumption stage ran");
    assert!(risk < assumptions, "stderr: {err}");
    assert!(!err.contains("✓ Main analysis complete"));

    let summary = json_summary(&output);
    assert_eq!(
        summary["stages"],
        serde_json::json!(["risk_assessment", "assumptions"])
    );
    assert_eq!(summary["results"].as_object().unwrap().len(), 2);
    assert!(summary["score"].is_null());
}

#[test]
fn empty_stage_selection_still_writes_report() {
    let ws = Workspace::new().expect("workspace");
    std::fs::write(
        ws.path().join("none.json"),
        r#"{"stages": {"run_main_analysis": false, "run_requirements_quality": false,
            "run_risk_assessment": false, "run_technical_complexity": false,
            "run_scope_creep_detection": false, "run_stakeholder_questions": false,
            "run_assumption_extraction": false}}"#,
    )
    .unwrap();
    let lm = mock_lm_command();
    let document = ws.document();
    let output = ws
        .run(&[
            "analyze",
            document.to_str().unwrap(),
            "--config",
            "none.json",
            "--lm",
            &lm,
        ])
        .expect("run analyzer");

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let out = stdout(&output);
    assert!(out.contains("Stages completed: 0"), "stdout: {out}");
    assert!(out.contains("No stages were enabled"), "stdout: {out}");
    assert!(out.contains("Scope clarity score: N/A/100"), "stdout: {out}");
    assert_eq!(ws.default_reports().len(), 1);
}

#[test]
fn failing_lm_still_completes_with_sentinels() {
    let ws = Workspace::new().expect("workspace");
    let document = ws.document();
    let output = ws
        .run(&[
            "analyze",
            document.to_str().unwrap(),
            "--json",
            "--lm",
            "sh -c 'exit 3'",
        ])
        .expect("run analyzer");

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(stderr(&output).contains("Error in Main Analysis: LM command failed"));

    let summary = json_summary(&output);
    let results = summary["results"].as_object().unwrap();
    assert_eq!(results.len(), 7);
    assert_eq!(summary["failed_stages"].as_array().unwrap().len(), 7);
    let main = results["main_analysis"].as_str().unwrap();
    assert!(main.starts_with("Error occurred during Main Analysis: "), "{main}");
    let creep = results["scope_creep"].as_str().unwrap();
    assert!(creep.starts_with("Error occurred during Scope Creep Detection: "));
    let report = summary["report"].as_str().unwrap();
    assert!(report.starts_with("Error occurred during Report Generation: "));
    assert!(summary["score"].is_null());
    assert_eq!(summary["risk_level"], "LOW");
    assert_eq!(ws.default_reports().len(), 1);
}

#[test]
fn missing_credential_fails_before_any_stage() {
    let ws = Workspace::new().expect("workspace");
    let document = ws.document();
    let output = ws
        .run(&["analyze", document.to_str().unwrap()])
        .expect("run analyzer");

    assert!(!output.status.success());
    let err = stderr(&output);
    assert!(err.contains("API key not found"), "stderr: {err}");
    assert!(!err.contains("✓"), "no stage should run: {err}");
    assert!(ws.default_reports().is_empty());
}

#[test]
fn missing_lm_command_program_is_fatal() {
    let ws = Workspace::new().expect("workspace");
    let document = ws.document();
    let output = ws
        .run(&[
            "analyze",
            document.to_str().unwrap(),
            "--lm",
            "definitely-not-a-real-lm-binary",
        ])
        .expect("run analyzer");

    assert!(!output.status.success());
    assert!(stderr(&output).contains("LM command not found: definitely-not-a-real-lm-binary"));
    assert!(ws.default_reports().is_empty());
}

#[test]
fn missing_document_is_rejected() {
    let ws = Workspace::new().expect("workspace");
    let lm = mock_lm_command();
    let output = ws
        .run(&["analyze", "nope.md", "--lm", &lm])
        .expect("run analyzer");

    assert!(!output.status.success());
    assert!(stderr(&output).contains("document not found: nope.md"));
}

#[test]
fn empty_document_is_rejected() {
    let ws = Workspace::new().expect("workspace");
    std::fs::write(ws.path().join("blank.md"), "  \n\t\n").unwrap();
    let lm = mock_lm_command();
    let output = ws
        .run(&["analyze", "blank.md", "--lm", &lm])
        .expect("run analyzer");

    assert!(!output.status.success());
    assert!(stderr(&output).contains("document is empty"));
}

#[test]
fn quick_conflicts_with_stage_list() {
    let ws = Workspace::new().expect("workspace");
    let output = ws
        .run(&["analyze", "brief.md", "--quick", "--stages", "main_analysis"])
        .expect("run analyzer");
    assert!(!output.status.success());
}

#[test]
fn unknown_stage_key_is_rejected() {
    let ws = Workspace::new().expect("workspace");
    let output = ws
        .run(&["analyze", "brief.md", "--stages", "scope_creep_detection"])
        .expect("run analyzer");
    assert!(!output.status.success());
    assert!(stderr(&output).contains("unknown stage"));
}

#[test]
fn lm_log_records_every_call_and_info_summarizes_it() {
    let ws = Workspace::new().expect("workspace");
    let lm = mock_lm_command();
    let document = ws.document();
    let output = ws
        .run(&[
            "analyze",
            document.to_str().unwrap(),
            "--stages",
            "main_analysis,stakeholder_questions",
            "--lm",
            &lm,
            "--lm-log",
            "logs/lm.jsonl",
        ])
        .expect("run analyzer");
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let log = std::fs::read_to_string(ws.path().join("logs/lm.jsonl")).expect("read lm log");
    let entries: Vec<serde_json::Value> = log
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(entries.len(), 3);
    assert_eq!(entries[0]["stage"], "main_analysis");
    assert_eq!(entries[1]["stage"], "stakeholder_questions");
    assert!(entries[2]["stage"].is_null());
    assert_eq!(entries[2]["label"], "Report Generation");

    let info = ws
        .run(&["info", "--lm-log", "logs/lm.jsonl"])
        .expect("run info");
    assert!(info.status.success());
    let out = stdout(&info);
    assert!(out.contains("calls: 3, failed: 0"), "stdout: {out}");
}

#[test]
fn info_lists_stages_and_requirements() {
    let ws = Workspace::new().expect("workspace");
    let output = ws.run(&["info"]).expect("run info");
    assert!(output.status.success());
    let out = stdout(&output);
    for key in [
        "main_analysis",
        "requirements_quality",
        "risk_assessment",
        "technical_complexity",
        "scope_creep",
        "stakeholder_questions",
        "assumptions",
    ] {
        assert!(out.contains(key), "missing {key} in: {out}");
    }
    assert!(out.contains("ANTHROPIC_API_KEY"));
}
