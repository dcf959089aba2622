//! Rendering of a [`TraceReport`] for the terminal.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use tabled::settings::Style;
use tabled::{Table, Tabled};
use termtree::Tree;

use crate::error::LbTraceError;
use crate::pipeline::TraceReport;
use crate::resolvers::{BranchScope, ResolveError, Stage};
use crate::resource::Correlation;

const NONE: &str = "-";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Table,
    Tree,
    Json,
}

#[derive(Tabled)]
struct Row<'a> {
    #[tabled(rename = "Autoscaling group")]
    group: &'a str,
    #[tabled(rename = "Target group")]
    target_group: &'a str,
    #[tabled(rename = "Listener")]
    listener: &'a str,
}

#[derive(Serialize)]
struct FailureView<'a> {
    stage: Stage,
    identifier: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    branch: Option<&'a BranchScope>,
    error: String,
}

impl<'a> From<&'a ResolveError> for FailureView<'a> {
    fn from(failure: &'a ResolveError) -> Self {
        Self {
            stage: failure.stage,
            identifier: &failure.identifier,
            branch: failure.branch.as_ref(),
            error: failure.source.to_string(),
        }
    }
}

#[derive(Serialize)]
struct JsonReport<'a> {
    project: &'a str,
    stage: &'a str,
    groups: &'a BTreeMap<String, BTreeSet<String>>,
    records: &'a [Correlation],
    failures: Vec<FailureView<'a>>,
}

pub fn render(report: &TraceReport, format: OutputFormat) -> Result<String, LbTraceError> {
    match format {
        OutputFormat::Table => Ok(render_table(report)),
        OutputFormat::Tree => Ok(render_tree(report)),
        OutputFormat::Json => render_json(report),
    }
}

/// One row per record. Groups without a forwarding listener get a single
/// placeholder row so every matched group shows up.
pub fn render_table(report: &TraceReport) -> String {
    let mut rows = Vec::new();
    for group in report.groups.keys() {
        let start = rows.len();
        rows.extend(report.records_for(group).map(|r| Row {
            group,
            target_group: &r.target_group_id,
            listener: &r.listener_id,
        }));
        if rows.len() == start {
            rows.push(Row {
                group,
                target_group: NONE,
                listener: NONE,
            });
        }
    }

    Table::new(rows).with(Style::rounded()).to_string()
}

pub fn render_tree(report: &TraceReport) -> String {
    let mut root = Tree::new(format!("{} ({})", report.project, report.stage));

    for (group, target_groups) in &report.groups {
        let mut group_node = Tree::new(group.clone());
        for target_group in target_groups {
            let listeners = report
                .records_for(group)
                .filter(|r| &r.target_group_id == target_group)
                .map(|r| Tree::new(r.listener_id.clone()));
            group_node.push(Tree::new(target_group.clone()).with_leaves(listeners));
        }
        root.push(group_node);
    }

    root.to_string()
}

pub fn render_json(report: &TraceReport) -> Result<String, LbTraceError> {
    let view = JsonReport {
        project: &report.project,
        stage: &report.stage,
        groups: &report.groups,
        records: &report.records,
        failures: report.failures.iter().map(FailureView::from).collect(),
    };
    Ok(serde_json::to_string_pretty(&view)?)
}

/// One line per failure, for stderr.
pub fn failure_lines(report: &TraceReport) -> Vec<String> {
    report.failures.iter().map(|f| format!("error: {f}")).collect()
}
