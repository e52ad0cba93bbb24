use chartcert_core::lint::CONFIG_STRICT;
use chartcert_core::{Cancellation, Certificate, CertifierConfig, Certifier, CheckRunner, LintConfig};

use super::super::args::{CertificateFormat, CertifyArgs};
use crate::exit_codes::{EXIT_NOT_CERTIFIED, EXIT_SUCCESS};

pub(crate) async fn run(args: CertifyArgs) -> anyhow::Result<i32> {
    let mut config = CertifierConfig::from_env();
    if let Some(secs) = args.timeout {
        config = config.with_timeout_secs(secs);
    }

    let mut runner = if args.checks.is_empty() {
        CheckRunner::new()
    } else {
        CheckRunner::with_checks(&args.checks)?
    };
    if args.lint_strict {
        runner = runner.with_lint_config(LintConfig::new().with(CONFIG_STRICT, "true"));
    }

    let certifier = Certifier::new(config, runner)?.parallel(args.parallel);

    let cancel = Cancellation::new();
    let on_interrupt = cancel.clone();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupted, cancelling chart load");
            on_interrupt.cancel();
        }
    });

    let result = certifier.certify_with_cancel(&args.uri, &cancel).await;
    interrupt.abort();
    let certificate = result?;

    println!("{}", render(&certificate, args.output)?);

    if certificate.is_ok() {
        Ok(EXIT_SUCCESS)
    } else {
        Ok(EXIT_NOT_CERTIFIED)
    }
}

fn render(certificate: &Certificate, format: CertificateFormat) -> anyhow::Result<String> {
    let out = match format {
        CertificateFormat::Json => certificate.to_json_pretty()?,
        CertificateFormat::Yaml => certificate.to_yaml()?,
        CertificateFormat::Text => render_text(certificate),
    };
    Ok(out)
}

fn render_text(certificate: &Certificate) -> String {
    let mut out = format!(
        "{} {}\n",
        certificate.chart_name(),
        certificate.chart_version()
    );
    for (name, result) in certificate.results().iter() {
        let status = if result.ok { "PASS" } else { "FAIL" };
        out.push_str(&format!("{status:<5}{name}: {}\n", result.reason));
    }
    let verdict = if certificate.is_ok() {
        "certified"
    } else {
        "not certified"
    };
    out.push_str(verdict);
    out
}
