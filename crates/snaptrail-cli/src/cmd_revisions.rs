use anyhow::Result;
use clap::Args;
use snaptrail_git::{GitSource, RevisionInfo};
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct RevisionsArgs {
    /// Path to the git repository
    #[arg(short, long, default_value = ".")]
    repo: PathBuf,

    /// Tracked file, relative to the repository root
    #[arg(short, long)]
    path: String,

    /// Branch name or revision expression
    #[arg(short, long, default_value = "main")]
    branch: String,

    /// Output as JSON
    #[arg(long)]
    json: bool,
}

pub fn run(args: RevisionsArgs, pretty: bool) -> Result<()> {
    let repo_path = if args.repo.is_absolute() {
        args.repo
    } else {
        std::env::current_dir()?.join(&args.repo)
    };

    let source = GitSource::open(&repo_path, &args.path, &args.branch)?;
    let infos = source.list_revision_info()?;

    if args.json {
        let output = revisions_json(&source, &infos);
        let json = if pretty {
            serde_json::to_string_pretty(&output)?
        } else {
            serde_json::to_string(&output)?
        };
        println!("{}", json);
    } else {
        print!("{}", revisions_text(&source, &infos));
    }
    Ok(())
}

fn revisions_text(source: &GitSource, infos: &[RevisionInfo]) -> String {
    let mut out = format!("{} on {}\n\n", source.path(), source.reference());
    if infos.is_empty() {
        out.push_str("  (no revisions)\n");
    }
    for info in infos {
        let marker = if info.present { ' ' } else { 'D' };
        out.push_str(&format!(
            "  {} {} {} {}\n",
            info.short,
            info.timestamp,
            marker,
            truncate(&info.subject, 60)
        ));
    }
    out
}

fn revisions_json(source: &GitSource, infos: &[RevisionInfo]) -> serde_json::Value {
    let items: Vec<serde_json::Value> = infos
        .iter()
        .map(|info| {
            serde_json::json!({
                "commit": info.revision.id,
                "timestamp": info.timestamp,
                "subject": info.subject,
                "author": info.author,
                "present": info.present,
            })
        })
        .collect();
    serde_json::json!({
        "path": source.path(),
        "reference": source.reference(),
        "revisions": items,
    })
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max - 3).collect();
        format!("{}...", truncated)
    }
}
