//! Live checks against a running monitoring API

use crate::CliError;
use crate::cli::SelfTestArgs;
use serde_json::Value;
use std::io::Write;
use std::time::{Duration, Instant};
use tracing::debug;

/// Responses slower than this fail the performance check
pub const SLOW_RESPONSE: Duration = Duration::from_secs(2);

const PERFORMANCE_ROUNDS: usize = 5;
const MODEL_ENDPOINTS: [&str; 5] = [
    "/api/analytics/monitor/users/",
    "/api/analytics/monitor/books/",
    "/api/analytics/monitor/loans/",
    "/api/analytics/monitor/analytics/",
    "/api/analytics/monitor/system/",
];

/// Outcome of one check
#[derive(Debug, Clone, PartialEq)]
pub struct CheckResult {
    pub name: String,
    pub passed: bool,
    pub detail: String,
}

impl CheckResult {
    fn pass(name: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            passed: true,
            detail: detail.into(),
        }
    }

    fn fail(name: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            passed: false,
            detail: detail.into(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SelfTestReport {
    pub checks: Vec<CheckResult>,
}

impl SelfTestReport {
    pub fn passed(&self) -> bool {
        self.checks.iter().all(|c| c.passed)
    }

    pub fn failures(&self) -> impl Iterator<Item = &CheckResult> {
        self.checks.iter().filter(|c| !c.passed)
    }

    pub fn write_to<W: Write>(&self, out: &mut W) -> std::io::Result<()> {
        for check in &self.checks {
            let mark = if check.passed { "PASS" } else { "FAIL" };
            writeln!(out, "[{mark}] {}: {}", check.name, check.detail)?;
        }
        let failed = self.failures().count();
        writeln!(
            out,
            "{} checks, {} passed, {} failed",
            self.checks.len(),
            self.checks.len() - failed,
            failed
        )
    }
}

/// Which groups of checks to run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SelfTestPlan {
    pub basic: bool,
    pub endpoints: bool,
    pub metrics: bool,
    pub alerts: bool,
    pub performance: bool,
}

impl SelfTestPlan {
    pub fn everything() -> Self {
        Self {
            basic: true,
            endpoints: true,
            metrics: true,
            alerts: true,
            performance: true,
        }
    }

    /// `--all` selects every group; no flag selects the basic checks
    pub fn from_args(args: &SelfTestArgs) -> Self {
        if args.all {
            return Self::everything();
        }
        let plan = Self {
            basic: false,
            endpoints: args.endpoints,
            metrics: args.metrics,
            alerts: args.alerts,
            performance: args.performance,
        };
        if plan == Self::default() {
            Self {
                basic: true,
                ..plan
            }
        } else {
            plan
        }
    }
}

/// HTTP client for the live checks
pub struct SelfTest {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl SelfTest {
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Result<Self, CliError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CliError::self_test(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    pub async fn run(&self, plan: SelfTestPlan) -> SelfTestReport {
        let mut report = SelfTestReport::default();
        if plan.basic {
            self.check_basic(&mut report).await;
        }
        if plan.metrics {
            self.check_metrics(&mut report).await;
        }
        if plan.endpoints {
            self.check_endpoints(&mut report).await;
        }
        if plan.alerts {
            self.check_alerts(&mut report).await;
        }
        if plan.performance {
            self.check_performance(&mut report).await;
        }
        report
    }

    async fn get(&self, path: &str, authenticated: bool) -> reqwest::Result<reqwest::Response> {
        let url = format!("{}{}", self.base_url, path);
        debug!("GET {}", url);
        let mut request = self.client.get(url);
        if authenticated {
            request = request.header("x-api-key", &self.api_key);
        }
        request.send().await
    }

    async fn get_json(&self, path: &str) -> Result<Value, String> {
        let response = self.get(path, true).await.map_err(|e| e.to_string())?;
        let status = response.status();
        if !status.is_success() {
            return Err(format!("HTTP {status}"));
        }
        response
            .json::<Value>()
            .await
            .map_err(|e| format!("invalid JSON: {e}"))
    }

    async fn check_basic(&self, report: &mut SelfTestReport) {
        let liveness = match self.get("/health", false).await {
            Ok(response) if response.status().is_success() => {
                match response.json::<Value>().await {
                    Ok(body) if body["status"] == "healthy" => CheckResult::pass(
                        "liveness",
                        format!("version {}", body["version"].as_str().unwrap_or("?")),
                    ),
                    Ok(body) => CheckResult::fail("liveness", format!("unexpected body {body}")),
                    Err(e) => CheckResult::fail("liveness", format!("invalid JSON: {e}")),
                }
            }
            Ok(response) => CheckResult::fail("liveness", format!("HTTP {}", response.status())),
            Err(e) => CheckResult::fail("liveness", e.to_string()),
        };
        report.checks.push(liveness);

        let public = match self.get("/api/analytics/public-dashboard/", false).await {
            Ok(response) if response.status().is_success() => {
                CheckResult::pass("public dashboard", "reachable without credentials")
            }
            Ok(response) => {
                CheckResult::fail("public dashboard", format!("HTTP {}", response.status()))
            }
            Err(e) => CheckResult::fail("public dashboard", e.to_string()),
        };
        report.checks.push(public);

        let gate = match self.get("/api/analytics/monitor/system/", false).await {
            Ok(response) if response.status() == reqwest::StatusCode::FORBIDDEN => {
                CheckResult::pass("admin gate", "anonymous request rejected")
            }
            Ok(response) => CheckResult::fail(
                "admin gate",
                format!("anonymous request got HTTP {}", response.status()),
            ),
            Err(e) => CheckResult::fail("admin gate", e.to_string()),
        };
        report.checks.push(gate);

        let authorized = match self.get_json("/api/analytics/monitor/system/").await {
            Ok(body) => CheckResult::pass(
                "system health",
                format!(
                    "{} (healthy: {})",
                    body["system_status"].as_str().unwrap_or("?"),
                    body["overall_healthy"]
                ),
            ),
            Err(e) => CheckResult::fail("system health", e),
        };
        report.checks.push(authorized);
    }

    async fn check_metrics(&self, report: &mut SelfTestReport) {
        let result = match self.get("/metrics", true).await {
            Ok(response) if response.status().is_success() => {
                let content_type = response
                    .headers()
                    .get(reqwest::header::CONTENT_TYPE)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or_default()
                    .to_string();
                match response.text().await {
                    Ok(body) if !content_type.starts_with("text/plain") => CheckResult::fail(
                        "metrics",
                        format!("unexpected content type '{content_type}' ({} bytes)", body.len()),
                    ),
                    Ok(body)
                        if body.contains("library_api_requests_total")
                            && body.contains("library_users_total") =>
                    {
                        let families = body.lines().filter(|l| l.starts_with("# TYPE")).count();
                        CheckResult::pass("metrics", format!("{families} metric families"))
                    }
                    Ok(_) => CheckResult::fail("metrics", "expected metric families missing"),
                    Err(e) => CheckResult::fail("metrics", e.to_string()),
                }
            }
            Ok(response) => CheckResult::fail("metrics", format!("HTTP {}", response.status())),
            Err(e) => CheckResult::fail("metrics", e.to_string()),
        };
        report.checks.push(result);
    }

    async fn check_endpoints(&self, report: &mut SelfTestReport) {
        for path in MODEL_ENDPOINTS {
            let started = Instant::now();
            let result = match self.get_json(path).await {
                Ok(body) if body.get("timestamp").is_some() => CheckResult::pass(
                    path,
                    format!("OK ({:.3}s)", started.elapsed().as_secs_f64()),
                ),
                Ok(_) => CheckResult::fail(path, "response lacks a timestamp"),
                Err(e) => CheckResult::fail(path, e),
            };
            report.checks.push(result);
        }
    }

    async fn check_alerts(&self, report: &mut SelfTestReport) {
        let result = match self.get_json("/api/analytics/monitor/system/").await {
            Ok(body) => match body["alerts"].as_array() {
                Some(alerts)
                    if alerts
                        .iter()
                        .all(|a| a["severity"].is_string() && a["message"].is_string()) =>
                {
                    let critical = alerts.iter().filter(|a| a["severity"] == "critical").count();
                    CheckResult::pass(
                        "alerts",
                        format!("{} active alert(s), {critical} critical", alerts.len()),
                    )
                }
                Some(_) => CheckResult::fail("alerts", "malformed alert entries"),
                None => CheckResult::fail("alerts", "snapshot has no alert list"),
            },
            Err(e) => CheckResult::fail("alerts", e),
        };
        report.checks.push(result);
    }

    async fn check_performance(&self, report: &mut SelfTestReport) {
        let mut timings = Vec::with_capacity(PERFORMANCE_ROUNDS);
        for _ in 0..PERFORMANCE_ROUNDS {
            let started = Instant::now();
            if let Err(e) = self.get_json("/api/analytics/monitor/system/").await {
                report.checks.push(CheckResult::fail("performance", e));
                return;
            }
            timings.push(started.elapsed());
        }

        let max = timings.iter().max().copied().unwrap_or_default();
        let avg = timings.iter().sum::<Duration>() / PERFORMANCE_ROUNDS as u32;
        let detail = format!(
            "avg {:.1} ms, max {:.1} ms over {PERFORMANCE_ROUNDS} requests",
            avg.as_secs_f64() * 1000.0,
            max.as_secs_f64() * 1000.0
        );
        report.checks.push(if max < SLOW_RESPONSE {
            CheckResult::pass("performance", detail)
        } else {
            CheckResult::fail("performance", detail)
        });
    }
}
