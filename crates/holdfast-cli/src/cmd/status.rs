use crate::output::{print_json, print_table};
use holdfast_core::inbox::{Inbox, QueueSummary};
use holdfast_core::paths;
use holdfast_core::record;
use holdfast_core::resolver;
use std::path::Path;

pub fn run(root: &Path, session: Option<&str>, json: bool) -> anyhow::Result<()> {
    let files = resolver::scan(root);
    let governing = session.and_then(|s| resolver::resolve(root, s));
    let queue: Option<QueueSummary> = session.and_then(|s| {
        Inbox::at_hub().ok().map(|inbox| inbox.summary(s))
    });

    if json {
        #[derive(serde::Serialize)]
        struct FileStatus {
            file: String,
            family: &'static str,
            session: Option<String>,
            iteration: Option<u32>,
            max_iterations: Option<u32>,
            enabled: Option<bool>,
        }

        #[derive(serde::Serialize)]
        struct GoverningStatus {
            family: &'static str,
            file: String,
            skill: String,
            iteration: u32,
            max_iterations: u32,
        }

        #[derive(serde::Serialize)]
        struct StatusOutput {
            state_files: Vec<FileStatus>,
            governing: Option<GoverningStatus>,
            queue: Option<QueueSummary>,
        }

        let state_files = files
            .iter()
            .map(|f| {
                let rec = record::read(&paths::holdfast_dir(root).join(&f.file_name));
                FileStatus {
                    file: f.file_name.clone(),
                    family: f.family.as_str(),
                    session: f.session_segment.clone(),
                    iteration: rec.as_ref().map(|r| r.iteration),
                    max_iterations: rec.as_ref().map(|r| r.max_iterations),
                    enabled: rec.as_ref().map(|r| r.enabled),
                }
            })
            .collect();

        let output = StatusOutput {
            state_files,
            governing: governing.as_ref().map(|g| GoverningStatus {
                family: g.family.as_str(),
                file: g.path.display().to_string(),
                skill: g.record.skill.clone(),
                iteration: g.record.iteration,
                max_iterations: g.record.max_iterations,
            }),
            queue,
        };
        return print_json(&output);
    }

    // -- Human-readable output ------------------------------------------------

    if files.is_empty() {
        println!("No active modes.");
    } else {
        let rows: Vec<Vec<String>> = files
            .iter()
            .map(|f| {
                let rec = record::read(&paths::holdfast_dir(root).join(&f.file_name));
                let iter = rec
                    .as_ref()
                    .map(|r| format!("{}/{}", r.iteration, r.max_iterations))
                    .unwrap_or_else(|| "?".to_string());
                let enabled = match rec.as_ref().map(|r| r.enabled) {
                    Some(false) => "disabled",
                    _ => "",
                };
                vec![
                    f.file_name.clone(),
                    f.family.to_string(),
                    f.session_segment.clone().unwrap_or_else(|| "legacy".to_string()),
                    iter,
                    enabled.to_string(),
                ]
            })
            .collect();
        print_table(&["FILE", "FAMILY", "SCOPE", "ITER", ""], rows);
    }

    if let Some(g) = &governing {
        println!(
            "\nGoverning: {} ({}), iteration {}/{}",
            g.path.display(),
            g.family,
            g.record.iteration,
            g.record.max_iterations
        );
    } else if session.is_some() {
        println!("\nGoverning: none (normal stops allowed)");
    }

    if let Some(q) = &queue {
        println!(
            "Inbox: {} pending, {} inflight, {} processed",
            q.pending, q.inflight, q.processed
        );
    }

    Ok(())
}
