//! Design form command-line driver
//!
//! Runs one form session against a directory store: mount, apply one
//! command, submit, report.

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod file_remote;
pub mod terminal;

use anyhow::{bail, Context, Result};
use design_core::{
    Collaborators, DesignView, Destination, Endpoint, FormConfig, RatioTotal, SubmitOutcome,
    SyncController,
};
use design_snapshot::FieldPath;
use file_remote::FileRemote;
use std::fmt::Write;
use std::path::PathBuf;
use std::sync::Arc;
use terminal::{render_text, LogViewport, TerminalNavigator, TypeInto};
use tracing::info;

/// One edit to perform before saving
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Print the form; no save
    Show,
    Set { path: FieldPath, value: String },
    AddBranch,
    RemoveBranch(usize),
    AddPref(usize),
    RemovePref { branch: usize, index: usize },
}

impl Command {
    #[must_use]
    pub fn saves(&self) -> bool {
        !matches!(self, Self::Show)
    }
}

/// Everything needed for one session
#[derive(Debug, Clone)]
pub struct Invocation {
    pub root: PathBuf,
    pub slug: String,
    pub kind: String,
    pub config: FormConfig,
    pub command: Command,
    pub destination: Destination,
}

/// What a session did
#[derive(Debug)]
pub struct Report {
    pub view: DesignView,
    pub outcome: Option<SubmitOutcome>,
    pub navigated: Option<String>,
    pub ratio: RatioTotal,
}

impl Report {
    /// False if a save was attempted and did not go through
    #[must_use]
    pub fn succeeded(&self) -> bool {
        matches!(self.outcome, None | Some(SubmitOutcome::Saved { .. }))
    }

    #[must_use]
    pub fn render(&self) -> String {
        let mut out = render_text(&self.view);
        if !self.ratio.is_balanced() {
            let _ = writeln!(
                out,
                "warning: branch ratios add up to {} ({} unparsed); expected 100",
                self.ratio.total, self.ratio.unparsed
            );
        }
        match &self.outcome {
            None => {}
            Some(SubmitOutcome::Saved { url }) => {
                let _ = writeln!(out, "saved; next: {url}");
            }
            Some(SubmitOutcome::Rejected { first_invalid }) => {
                let first = first_invalid
                    .as_ref()
                    .map_or_else(|| "-".to_string(), ToString::to_string);
                let _ = writeln!(out, "rejected; first invalid field: {first}");
            }
            Some(SubmitOutcome::Failed { message }) => {
                let _ = writeln!(out, "save failed: {message}");
            }
            Some(other) => {
                let _ = writeln!(out, "save not performed: {other:?}");
            }
        }
        out
    }
}

fn apply(controller: &SyncController, command: &Command) -> Result<()> {
    match command {
        Command::Show => {}
        Command::Set { path, value } => {
            let view = controller.view();
            if view.binding(path).is_none() {
                bail!("no field at '{path}' for this design");
            }
            let mut widgets = TypeInto {
                target: path.clone(),
                value: value.clone(),
            };
            for edit in view.render_with(&mut widgets) {
                controller.apply(&edit).with_context(|| format!("applying {edit}"))?;
            }
        }
        Command::AddBranch => {
            let index = controller.add_branch().context("adding branch")?;
            info!(index, "branch added");
        }
        Command::RemoveBranch(index) => {
            controller
                .remove_branch(*index)
                .with_context(|| format!("removing branch {index}"))?;
        }
        Command::AddPref(branch) => {
            let index = controller
                .add_preference(*branch)
                .with_context(|| format!("adding preference to branch {branch}"))?;
            info!(branch, index, "preference added");
        }
        Command::RemovePref { branch, index } => {
            controller
                .remove_preference(*branch, *index)
                .with_context(|| format!("removing preference {index} of branch {branch}"))?;
        }
    }
    Ok(())
}

/// Run one session
///
/// # Errors
/// Fails if the endpoint is invalid, the record cannot be loaded, or the
/// command does not fit the design. A rejected save is not an error; it is
/// reported in the [`Report`].
pub async fn run(invocation: Invocation) -> Result<Report> {
    let endpoint = Endpoint::new(&invocation.slug, &invocation.kind)?;
    let navigator = Arc::new(TerminalNavigator::default());
    let collaborators = Collaborators::new(
        Arc::new(FileRemote::new(&invocation.root)),
        navigator.clone(),
    )
    .with_viewport(Arc::new(LogViewport));
    let controller = SyncController::new(endpoint.clone(), invocation.config, collaborators);

    controller
        .mount()
        .await
        .with_context(|| format!("loading {endpoint} from {}", invocation.root.display()))?;
    apply(&controller, &invocation.command)?;

    let outcome = if invocation.command.saves() {
        Some(controller.submit(invocation.destination).await)
    } else {
        None
    };
    let store = controller.store();
    controller.teardown();

    Ok(Report {
        view: store.view(),
        outcome,
        navigated: navigator.last_url(),
        ratio: store.ratio_total(),
    })
}
