use std::sync::Arc;

use patron_core::clock::SystemClock;
use patron_core::config::{AppConfig, LoadOptions};
use patron_db::connect_with_config;
use patron_server::bootstrap::build_repository;
use patron_server::token::{JwtTokenIssuer, TokenIssuer};
use serde::Serialize;

use crate::commands::CommandResult;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

pub fn run(json_output: bool) -> CommandResult {
    let report = build_report();
    let exit_code = if report.overall_status == CheckStatus::Pass { 0 } else { 1 };

    let output = if json_output {
        serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        })
    } else {
        render_human(&report)
    };

    CommandResult { exit_code, output }
}

fn build_report() -> DoctorReport {
    let checks = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => vec![
            DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: format!(
                    "configuration loaded for `{}` environment",
                    config.environment.as_str()
                ),
            },
            check_signing_key(&config),
            check_storage_connectivity(&config),
        ],
        Err(error) => vec![
            DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            },
            skipped("signing_key"),
            skipped("storage_connectivity"),
        ],
    };

    summarize(checks)
}

fn summarize(checks: Vec<DoctorCheck>) -> DoctorReport {
    let all_pass = checks.iter().all(|check| check.status == CheckStatus::Pass);
    let overall_status = if all_pass { CheckStatus::Pass } else { CheckStatus::Fail };
    let summary = if all_pass {
        "doctor: all readiness checks passed".to_string()
    } else {
        "doctor: one or more readiness checks failed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

fn skipped(name: &'static str) -> DoctorCheck {
    DoctorCheck {
        name,
        status: CheckStatus::Skipped,
        details: "skipped because configuration did not load".to_string(),
    }
}

/// Signs a sample token and verifies it with the same configuration.
fn check_signing_key(config: &AppConfig) -> DoctorCheck {
    let result = JwtTokenIssuer::from_config(&config.auth, Arc::new(SystemClock))
        .and_then(|issuer| {
            let issued = issuer.generate_token("doctor-check")?;
            issuer.verify(&issued.access_token)
        });

    match result {
        Ok(claims) => DoctorCheck {
            name: "signing_key",
            status: CheckStatus::Pass,
            details: format!("sample token verified for issuer `{}`", claims.iss),
        },
        Err(error) => {
            DoctorCheck { name: "signing_key", status: CheckStatus::Fail, details: error.to_string() }
        }
    }
}

fn check_storage_connectivity(config: &AppConfig) -> DoctorCheck {
    if !config.database.backend.uses_database() {
        return DoctorCheck {
            name: "storage_connectivity",
            status: CheckStatus::Pass,
            details: format!("`{}` backend needs no database", config.database.backend),
        };
    }

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return DoctorCheck {
                name: "storage_connectivity",
                status: CheckStatus::Fail,
                details: format!("failed to initialize async runtime: {error}"),
            };
        }
    };

    let result = runtime.block_on(async {
        let pool = connect_with_config(&config.database)
            .await
            .map_err(|error| format!("failed to connect to database: {error}"))?;

        let readable = match build_repository(config.database.backend, Some(pool.clone())) {
            Ok(repository) => {
                repository.find_page(None, 1, 1).await.map(|_| ()).map_err(|error| {
                    format!("customer store is not readable (run `patron migrate`): {error}")
                })
            }
            Err(error) => Err(error.to_string()),
        };
        pool.close().await;
        readable
    });

    match result {
        Ok(()) => DoctorCheck {
            name: "storage_connectivity",
            status: CheckStatus::Pass,
            details: format!(
                "`{}` backend connected using `{}`",
                config.database.backend, config.database.url
            ),
        },
        Err(error) => {
            DoctorCheck { name: "storage_connectivity", status: CheckStatus::Fail, details: error }
        }
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}

fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::{render_human, skipped, summarize, CheckStatus, DoctorCheck};

    #[test]
    fn any_failed_check_fails_the_report() {
        let report = summarize(vec![
            DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: "auth.secret must not be empty".to_string(),
            },
            skipped("signing_key"),
        ]);

        assert_eq!(report.overall_status, CheckStatus::Fail);
        assert_eq!(
            render_human(&report),
            "doctor: one or more readiness checks failed\n\
             - [fail] config_validation: auth.secret must not be empty\n\
             - [skip] signing_key: skipped because configuration did not load"
        );
    }
}
