use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Subcommand};
use uuid::Uuid;

use siaga::{
    auth::CallerIdentity,
    report::{Report, ReportDraft, ReportPatch},
};

use super::open_service;

#[derive(Subcommand)]
pub enum ReportCommands {
    /// Submit a report on behalf of a reporter
    Submit(SubmitArgs),
    /// List all reports, newest first
    List,
    /// Show one report as JSON
    Get(IdArg),
    /// Verify a pending report and count it in the ledger
    Verify(IdArg),
    /// Reject a report, retracting it from the ledger if it was verified
    Reject(IdArg),
    /// Edit report fields, reconciling the ledger with the change
    Edit(EditArgs),
    /// Delete a report, retracting it from the ledger if it was verified
    Delete(IdArg),
}

#[derive(Args)]
pub struct SubmitArgs {
    /// District name, with or without the "Kecamatan" prefix
    pub district: String,

    /// Disaster type: flood, earthquake, or landslide
    pub disaster_type: String,

    /// Free-text description of the incident
    pub description: String,

    /// Year the incident occurred
    #[arg(long)]
    pub year: i32,

    /// Reporter identity to record; defaults to the local user
    #[arg(long)]
    pub reporter: Option<String>,
}

#[derive(Args)]
pub struct IdArg {
    /// Report identifier
    pub id: String,
}

#[derive(Args)]
pub struct EditArgs {
    /// Report identifier
    pub id: String,

    #[arg(long)]
    pub district: Option<String>,

    /// flood, earthquake, or landslide
    #[arg(long = "type")]
    pub disaster_type: Option<String>,

    #[arg(long)]
    pub description: Option<String>,

    #[arg(long)]
    pub year: Option<i32>,

    /// pending, verified, or rejected
    #[arg(long)]
    pub status: Option<String>,
}

pub fn execute(config_path: Option<PathBuf>, command: ReportCommands) -> Result<()> {
    let service = open_service(config_path)?;

    match command {
        ReportCommands::Submit(args) => {
            let reporter = args
                .reporter
                .unwrap_or_else(|| CallerIdentity::local_operator().subject);
            let report = service.submit(
                &reporter,
                ReportDraft {
                    district: args.district,
                    disaster_type: args.disaster_type.parse()?,
                    description: args.description,
                    year: args.year,
                },
            )?;
            print_report(&report);
        }
        ReportCommands::List => {
            for report in service.reports()? {
                print_report(&report);
            }
        }
        ReportCommands::Get(args) => {
            let report = service.report(parse_id(&args.id)?)?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        ReportCommands::Verify(args) => {
            let report = service.verify(parse_id(&args.id)?)?;
            print_report(&report);
        }
        ReportCommands::Reject(args) => {
            let report = service.reject(parse_id(&args.id)?)?;
            print_report(&report);
        }
        ReportCommands::Edit(args) => {
            let patch = ReportPatch {
                district: args.district,
                disaster_type: args
                    .disaster_type
                    .as_deref()
                    .map(str::parse)
                    .transpose()?,
                description: args.description,
                year: args.year,
                status: args.status.as_deref().map(str::parse).transpose()?,
            };
            let report = service.edit(parse_id(&args.id)?, patch)?;
            print_report(&report);
        }
        ReportCommands::Delete(args) => {
            let report = service.delete(parse_id(&args.id)?)?;
            println!("id={} deleted", report.id);
        }
    }

    Ok(())
}

fn parse_id(value: &str) -> Result<Uuid> {
    Uuid::parse_str(value.trim())
        .map_err(|err| anyhow::anyhow!("invalid report id '{value}': {err}"))
}

fn print_report(report: &Report) {
    println!(
        "id={} district={:?} type={} year={} status={} reporter={}",
        report.id,
        report.district,
        report.disaster_type,
        report.year,
        report.status,
        report.reporter_id
    );
}
