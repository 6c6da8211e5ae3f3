use crate::infra::{
    load_templates, parse_incomplete_policy, parse_unknown_codes, select_template,
    template_store, InMemoryReportStore, InMemoryTemplateStore,
};
use assessment_scoring::config::{AppConfig, EngineSettings};
use assessment_scoring::error::AppError;
use assessment_scoring::rubric::{
    validate_template, AssessmentDomain, Axis, EvaluationPolicy, EvaluationReport, FlagRule,
    IncompletePolicy, ResponseSet, ResponseSetImporter, ScoringConfig, ScoringService, Severity,
    StoredReport, Template, TemplateId, TemplateVersion, ThresholdLadder, UnknownCodePolicy,
};
use chrono::Local;
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;

type LocalService = ScoringService<InMemoryTemplateStore, InMemoryReportStore>;

#[derive(Args, Debug, Default)]
pub(crate) struct PolicyArgs {
    /// Missing-axis policy: lenient, zero_fill or strict (defaults to SCORING_INCOMPLETE_POLICY)
    #[arg(long, value_parser = parse_incomplete_policy)]
    pub(crate) policy: Option<IncompletePolicy>,
    /// Unknown axis/flag codes: reject or warn (defaults to SCORING_UNKNOWN_CODES)
    #[arg(long, value_parser = parse_unknown_codes)]
    pub(crate) unknown_codes: Option<UnknownCodePolicy>,
}

impl PolicyArgs {
    fn resolve(&self, settings: &EngineSettings) -> EvaluationPolicy {
        let mut policy = settings.policy();
        if let Some(incomplete) = self.policy {
            policy = policy.with_incomplete(incomplete);
        }
        if let Some(unknown_codes) = self.unknown_codes {
            policy = policy.with_unknown_codes(unknown_codes);
        }
        policy
    }
}

#[derive(Args, Debug)]
pub(crate) struct ValidateArgs {
    /// Template catalog JSON (defaults to SCORING_TEMPLATES, then the built-in templates)
    #[arg(long)]
    pub(crate) template: Option<PathBuf>,
    /// Validate only this template id
    #[arg(long)]
    pub(crate) template_id: Option<String>,
}

#[derive(Args, Debug)]
pub(crate) struct EvaluateArgs {
    /// Template catalog JSON (defaults to SCORING_TEMPLATES, then the built-in templates)
    #[arg(long)]
    pub(crate) template: Option<PathBuf>,
    /// Response set JSON: one object or an array of them
    #[arg(long)]
    pub(crate) responses: PathBuf,
    #[command(flatten)]
    pub(crate) policy: PolicyArgs,
    /// Print the report view as JSON instead of a summary
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Args, Debug)]
pub(crate) struct BatchArgs {
    /// Template catalog JSON (defaults to SCORING_TEMPLATES, then the built-in templates)
    #[arg(long)]
    pub(crate) template: Option<PathBuf>,
    /// Template the CSV rows were scored against; required for multi-template catalogs
    #[arg(long)]
    pub(crate) template_id: Option<String>,
    /// Batch CSV export: response_id, flags and one column per axis
    #[arg(long)]
    pub(crate) csv: PathBuf,
    #[command(flatten)]
    pub(crate) policy: PolicyArgs,
    /// Print the report views as JSON instead of summaries
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    #[command(flatten)]
    pub(crate) policy: PolicyArgs,
    /// Print each report view as JSON
    #[arg(long)]
    pub(crate) json: bool,
}

pub(crate) fn run_validate(args: ValidateArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let policy = config.engine.policy();
    let templates = load_templates(args.template.as_deref(), &config.engine)?;

    let selected = match args.template_id.as_deref() {
        Some(id) => vec![select_template(&templates, Some(id)).map_err(invalid_input)?],
        None => templates,
    };

    let mut malformed = 0;
    for template in &selected {
        let result = validate_template(template, &policy);
        let verdict = if result.is_valid() { "valid" } else { "malformed" };
        println!(
            "{} v{} ({}): {}",
            template.id,
            template.version,
            template.domain.label(),
            verdict
        );
        for issue in &result.issues {
            println!("  - [{:?}] {}", issue.severity, issue);
        }
        if !result.is_valid() {
            malformed += 1;
        }
    }

    println!(
        "{} template(s) checked, {} malformed",
        selected.len(),
        malformed
    );
    Ok(())
}

pub(crate) fn run_evaluate(args: EvaluateArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let policy = args.policy.resolve(&config.engine);
    let templates = load_templates(args.template.as_deref(), &config.engine)?;
    let service = local_service(templates, policy)?;

    let document = std::fs::read_to_string(&args.responses)?;
    let sets = parse_response_sets(&document).map_err(invalid_input)?;

    for set in &sets {
        let stored = service.evaluate(set)?;
        render_report(&stored, args.json);
    }
    Ok(())
}

pub(crate) fn run_batch(args: BatchArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let policy = args.policy.resolve(&config.engine);
    let templates = load_templates(args.template.as_deref(), &config.engine)?;
    let template =
        select_template(&templates, args.template_id.as_deref()).map_err(invalid_input)?;
    let template_id = template.id.clone();
    let service = local_service(templates, policy)?;

    let sets = ResponseSetImporter::from_path(&args.csv, &template_id)?;
    println!(
        "Batch evaluation of {} response set(s) against {} v{} on {}",
        sets.len(),
        template.id,
        template.version,
        Local::now().format("%Y-%m-%d %H:%M")
    );

    let mut tally = BatchTally::default();
    for set in &sets {
        let stored = service.evaluate(set)?;
        tally.record(&stored.report);
        render_report(&stored, args.json);
    }
    println!("{}", tally.summary());
    Ok(())
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let policy = args.policy.resolve(&config.engine);
    let templates = builtin_templates();

    println!("Rubric scoring demo");
    println!(
        "Policy: incomplete={} unknown_codes={} weight_epsilon={}",
        policy.incomplete.label(),
        policy.unknown_codes.label(),
        policy.weight_epsilon
    );

    println!("\nTemplates");
    for template in &templates {
        let result = validate_template(template, &policy);
        println!(
            "- {} ({}) | {} axes | {} flags | {}",
            template.id,
            template.domain.label(),
            template.axes.len(),
            template.declared_flags().count(),
            if result.is_empty() {
                "no issues".to_string()
            } else {
                format!("{} issue(s)", result.issues.len())
            }
        );
        for issue in &result.issues {
            println!("    {}", issue);
        }
    }

    let service = local_service(templates, policy)?;

    println!("\nEvaluations");
    let mut tally = BatchTally::default();
    for set in demo_response_sets() {
        let stored = service.evaluate(&set)?;
        tally.record(&stored.report);
        render_report(&stored, args.json);
    }

    // The same input again is served from the report store.
    let repeat = service.evaluate(&demo_response_sets()[0])?;
    println!(
        "\nRe-submitting {} reuses report {}",
        repeat.report.response_set_id(),
        &repeat.key.input_fingerprint[..12]
    );
    println!("{}", tally.summary());
    Ok(())
}

fn local_service(
    templates: Vec<Template>,
    policy: EvaluationPolicy,
) -> Result<LocalService, AppError> {
    let store = template_store(templates)?;
    Ok(ScoringService::new(
        Arc::new(store),
        Arc::new(InMemoryReportStore::default()),
        policy,
    ))
}

fn invalid_input(message: String) -> AppError {
    AppError::Io(std::io::Error::new(
        std::io::ErrorKind::InvalidInput,
        message,
    ))
}

pub(crate) fn parse_response_sets(document: &str) -> Result<Vec<ResponseSet>, String> {
    let parsed = if document.trim_start().starts_with('[') {
        serde_json::from_str(document)
    } else {
        serde_json::from_str(document).map(|set| vec![set])
    };
    parsed.map_err(|err| format!("invalid response set JSON: {err}"))
}

pub(crate) fn render_report(stored: &StoredReport, json: bool) {
    if json {
        match serde_json::to_string_pretty(&stored.report.view()) {
            Ok(body) => println!("{}", body),
            Err(err) => println!("  report view unavailable: {}", err),
        }
        return;
    }

    let report = &stored.report;
    println!("- {}: {}", report.response_set_id(), report.summary());
    match report {
        EvaluationReport::Accepted(accepted) => {
            for (axis, points) in &accepted.per_axis_contribution {
                println!("    {axis}: {points:.2}");
            }
            for flag in &accepted.flags.triggered {
                println!(
                    "    flag {} [{} {}]",
                    flag.code,
                    flag.severity,
                    flag.kind.label()
                );
            }
            for warning in &accepted.warnings {
                println!("    warning {}", warning);
            }
        }
        EvaluationReport::Rejected(rejected) => {
            for issue in rejected.issues.iter().filter(|issue| !issue.is_fatal()) {
                println!("    warning {}", issue);
            }
        }
    }
}

#[derive(Debug, Default, PartialEq)]
struct BatchTally {
    accepted: usize,
    passed: usize,
    critical: usize,
    rejected: usize,
}

impl BatchTally {
    fn record(&mut self, report: &EvaluationReport) {
        match report.accepted() {
            Some(accepted) => {
                self.accepted += 1;
                if accepted.passed {
                    self.passed += 1;
                }
                if accepted.flags.has_critical {
                    self.critical += 1;
                }
            }
            None => self.rejected += 1,
        }
    }

    fn summary(&self) -> String {
        format!(
            "{} scored ({} passed, {} with critical flags), {} could not be scored",
            self.accepted, self.passed, self.critical, self.rejected
        )
    }
}

const BRIDGE_LEVELS: [[&str; 5]; 3] = [
    [
        "Misses the deteriorating forecast entirely",
        "Notices the forecast but not traffic or sea room",
        "Tracks weather and traffic with prompting",
        "Maintains a full picture and anticipates changes",
        "Anticipates second-order effects and briefs them unprompted",
    ],
    [
        "No decision or an unsafe one",
        "Late decision with weak justification",
        "Safe decision, limited options considered",
        "Timely decision weighing alternatives",
        "Timely decision with contingencies prepared",
    ],
    [
        "Does not inform master or crew",
        "Informs master only when asked",
        "Reports to master, crew informed late",
        "Clear reports to master and crew",
        "Closed-loop communication throughout",
    ],
];

const GENERIC_LEVELS: [&str; 5] = [
    "No evidence",
    "Limited evidence",
    "Meets expectations",
    "Exceeds expectations",
    "Role model",
];

/// Templates seeded for the demo and when no catalog is configured.
pub(crate) fn builtin_templates() -> Vec<Template> {
    vec![bridge_watch(), deckhand_interview(), culture_pulse()]
}

fn bridge_watch() -> Template {
    Template {
        id: TemplateId("bridge-watch".to_string()),
        version: TemplateVersion("2024-05".to_string()),
        title: Some("Bridge watch under heavy weather".to_string()),
        domain: AssessmentDomain::MaritimeScenario,
        axes: vec![
            Axis::new("situational_awareness", 0.4, BRIDGE_LEVELS[0])
                .with_label("Situational awareness"),
            Axis::new("decision_making", 0.35, BRIDGE_LEVELS[1]).with_label("Decision making"),
            Axis::new("communication", 0.25, BRIDGE_LEVELS[2]).with_label("Communication"),
        ],
        red_flags: vec![
            FlagRule::new(
                "ignored_storm_warning",
                Severity::Critical,
                "Continues the passage plan after a storm warning",
            ),
            FlagRule::new(
                "no_lookout",
                Severity::Major,
                "No lookout posted in restricted visibility",
            ),
            FlagRule::new(
                "late_report",
                Severity::Medium,
                "Reports to the master after the situation develops",
            ),
        ],
        critical_omission_flags: vec![
            FlagRule::new(
                "no_log_entry",
                Severity::Medium,
                "Decision not recorded in the deck log",
            ),
            FlagRule::new(
                "no_crew_brief",
                Severity::Critical,
                "Crew never briefed on heavy weather precautions",
            ),
        ],
        scoring_config: ScoringConfig {
            passing_score: 65.0,
            level_thresholds: ThresholdLadder::from_pairs(&[
                ("unsafe", 0.0),
                ("developing", 50.0),
                ("competent", 65.0),
                ("exemplary", 85.0),
            ]),
        },
    }
}

/// Passing score sits between band boundaries, as authored.
fn deckhand_interview() -> Template {
    Template {
        id: TemplateId("deckhand-interview".to_string()),
        version: TemplateVersion("v2".to_string()),
        title: Some("Deckhand position interview".to_string()),
        domain: AssessmentDomain::JobInterview,
        axes: vec![
            Axis::new("safety_mindset", 0.4, GENERIC_LEVELS).with_label("Safety mindset"),
            Axis::new("teamwork", 0.3, GENERIC_LEVELS).with_label("Teamwork"),
            Axis::new("reliability", 0.3, GENERIC_LEVELS).with_label("Reliability"),
        ],
        red_flags: vec![
            FlagRule::new(
                "unsafe_shortcut",
                Severity::Critical,
                "Describes skipping lockout or PPE to save time",
            ),
            FlagRule::new(
                "blames_crew",
                Severity::Major,
                "Attributes every past incident to others",
            ),
        ],
        critical_omission_flags: vec![FlagRule::new(
            "no_ppe_mention",
            Severity::Medium,
            "Never mentions protective equipment when describing deck work",
        )],
        scoring_config: ScoringConfig {
            passing_score: 60.0,
            level_thresholds: ThresholdLadder::from_pairs(&[
                ("not_recommended", 0.0),
                ("consider", 55.0),
                ("recommend", 65.0),
                ("strong_hire", 85.0),
            ]),
        },
    }
}

fn culture_pulse() -> Template {
    Template {
        id: TemplateId("culture-pulse".to_string()),
        version: TemplateVersion("2024-Q2".to_string()),
        title: Some("Team culture pulse survey".to_string()),
        domain: AssessmentDomain::CultureSurvey,
        axes: vec![
            Axis::new("psychological_safety", 0.3, GENERIC_LEVELS),
            Axis::new("collaboration", 0.25, GENERIC_LEVELS),
            Axis::new("recognition", 0.2, GENERIC_LEVELS),
            Axis::new("autonomy", 0.25, GENERIC_LEVELS),
        ],
        red_flags: vec![FlagRule::new(
            "retaliation_reported",
            Severity::Critical,
            "A respondent reports retaliation for raising concerns",
        )],
        critical_omission_flags: vec![FlagRule::new(
            "no_manager_feedback",
            Severity::Low,
            "No feedback from a manager in the survey period",
        )],
        scoring_config: ScoringConfig {
            passing_score: 70.0,
            level_thresholds: ThresholdLadder::from_pairs(&[
                ("at_risk", 0.0),
                ("mixed", 40.0),
                ("healthy", 70.0),
                ("thriving", 85.0),
            ]),
        },
    }
}

fn demo_response_sets() -> Vec<ResponseSet> {
    let bridge = TemplateId("bridge-watch".to_string());
    let deckhand = TemplateId("deckhand-interview".to_string());
    let culture = TemplateId("culture-pulse".to_string());

    vec![
        ResponseSet::new("officer-001", bridge.clone())
            .with_level("situational_awareness", 4)
            .with_level("decision_making", 4)
            .with_raw("communication", 70.0),
        ResponseSet::new("officer-003", bridge.clone())
            .with_level("situational_awareness", 2)
            .with_raw("decision_making", 45.0)
            .with_flag("no_lookout")
            .with_flag("no_crew_brief"),
        ResponseSet::new("officer-009", bridge)
            .with_level("situational_awareness", 3)
            .with_level("decision_making", 3)
            .with_level("communication", 3)
            .with_flag("abandoned_watch"),
        ResponseSet::new("candidate-17", deckhand)
            .with_level("safety_mindset", 4)
            .with_level("teamwork", 3)
            .with_level("reliability", 3)
            .with_flag("no_ppe_mention"),
        ResponseSet::new("team-ops-q2", culture)
            .with_raw("psychological_safety", 72.5)
            .with_raw("collaboration", 81.0)
            .with_raw("recognition", 55.0)
            .with_raw("autonomy", 90.0),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use assessment_scoring::rubric::IssueKind;

    #[test]
    fn builtin_templates_are_well_formed() {
        let policy = EvaluationPolicy::default();
        for template in builtin_templates() {
            let result = validate_template(&template, &policy);
            assert!(result.is_valid(), "{}: {:?}", template.id, result.issues);
        }
    }

    #[test]
    fn interview_template_surfaces_off_boundary_pass_mark() {
        let result = validate_template(&deckhand_interview(), &EvaluationPolicy::default());
        let kinds: Vec<_> = result.issues.iter().map(|issue| issue.kind).collect();
        assert_eq!(kinds, vec![IssueKind::PassingScoreOffBoundary]);
    }

    #[test]
    fn demo_sets_cover_accepted_and_rejected_reports() {
        let service = local_service(builtin_templates(), EvaluationPolicy::default())
            .expect("service builds");
        let mut tally = BatchTally::default();
        for set in demo_response_sets() {
            let stored = service.evaluate(&set).expect("evaluation");
            tally.record(&stored.report);
        }

        assert_eq!(
            tally,
            BatchTally {
                accepted: 4,
                passed: 3,
                critical: 1,
                rejected: 1,
            }
        );
    }

    #[test]
    fn response_documents_accept_objects_and_arrays() {
        let single = r#"{"id": "r-1", "templateId": "bridge-watch"}"#;
        assert_eq!(parse_response_sets(single).expect("single").len(), 1);

        let many = format!("[{single}, {single}]");
        assert_eq!(parse_response_sets(&many).expect("array").len(), 2);

        assert!(parse_response_sets("{").is_err());
    }
}
