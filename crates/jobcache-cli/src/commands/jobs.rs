use anyhow::Result;
use jobcache_core::models::{Job, JobSearch};
use jobcache_core::utils::{format_date, format_optional};
use serde_json::json;

use super::{parse_json_arg, unless_queued, ApplicationsCommand};
use crate::context::AppContext;
use crate::output::{field, print_json, row};

fn job_row(job: &Job) -> String {
    let id = format_optional(job.id.as_deref(), "-");
    let company = format_optional(job.company.as_deref(), "-");
    let location = format_optional(job.location.as_deref(), "-");
    let score = job.match_display().unwrap_or_default();
    row(&[
        (id.as_str(), 8),
        (job.title_display(), 32),
        (company.as_str(), 20),
        (location.as_str(), 16),
        (score.as_str(), 5),
    ])
}

pub async fn search(ctx: &AppContext, search: &JobSearch) -> Result<()> {
    let Some(results) = unless_queued(ctx.api()?.search_jobs(search).await)? else {
        return Ok(());
    };
    if ctx.json {
        return print_json(&results.jobs);
    }
    if results.jobs.is_empty() {
        println!("No jobs found");
    }
    for job in &results.jobs {
        println!("{}", job_row(job));
    }
    if let Some(total) = results.total {
        println!("{} of {} jobs", results.jobs.len(), total);
    }
    Ok(())
}

pub async fn apply(
    ctx: &AppContext,
    job_id: &str,
    cover_letter: Option<String>,
    data: Option<&str>,
) -> Result<()> {
    let application = match data {
        Some(raw) => parse_json_arg("--data", raw)?,
        None => match cover_letter {
            Some(letter) => json!({ "cover_letter": letter }),
            None => json!({}),
        },
    };

    if let Some(ack) = unless_queued(ctx.api()?.apply(job_id, &application).await)? {
        if ctx.json {
            return print_json(&ack);
        }
        println!(
            "{}",
            ack.message.as_deref().unwrap_or("Application submitted")
        );
    }
    Ok(())
}

pub async fn applications(ctx: &AppContext, action: Option<ApplicationsCommand>) -> Result<()> {
    let api = ctx.api()?;
    if let Some(ApplicationsCommand::Update { id, status }) = action {
        let ack = api.update_application_status(&id, &status).await?;
        println!("{}", ack.message.as_deref().unwrap_or("Application updated"));
        return Ok(());
    }

    let applications = api.applications().await?;
    if ctx.json {
        return print_json(&applications);
    }
    if applications.is_empty() {
        println!("No applications yet");
    }
    for app in &applications {
        let id = format_optional(app.id.as_deref(), "-");
        let job = format_optional(app.job.as_deref(), "-");
        let company = format_optional(app.company.as_deref(), "-");
        let applied = app.applied.as_deref().map(format_date).unwrap_or_default();
        let status = format_optional(app.status.as_deref(), "pending");
        println!(
            "{}",
            row(&[
                (id.as_str(), 8),
                (job.as_str(), 28),
                (company.as_str(), 20),
                (applied.as_str(), 12),
                (status.as_str(), 12),
            ])
        );
    }
    Ok(())
}

pub async fn job(ctx: &AppContext, job_id: &str) -> Result<()> {
    let job = ctx.api()?.job(job_id).await?;
    if ctx.json {
        return print_json(&job);
    }
    field("Title", Some(job.title_display()));
    field("Company", job.company.as_deref());
    field("Location", job.location.as_deref());
    field("Type", job.job_type.as_deref());
    field("Salary", job.salary.as_deref());
    field("Match", job.match_display().as_deref());
    field("Posted", job.posted.as_deref().map(format_date).as_deref());
    if let Some(description) = &job.description {
        println!("\n{}", description);
    }
    Ok(())
}
