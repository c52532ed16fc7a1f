//! Subject and body text for each message kind.
//!
//! Every renderer returns both a plain-text and an HTML body. Values that
//! come from the directory are HTML-escaped before they reach the HTML
//! body; the plain-text body carries them verbatim.

use std::fmt::Write as _;

use crate::category::ReportCategory;
use crate::stakeholder::{Contact, StakeholderKind};

const SIGNATURE_TEXT: &str = "Cheers,\n\
CISA Cyber Assessments - Cyber Hygiene\n\
Cybersecurity and Infrastructure Security Agency\n\
vulnerability@cisa.dhs.gov\n";

const SIGNATURE_HTML: &str = "<p>Cheers,<br>\n\
CISA Cyber Assessments - Cyber Hygiene<br>\n\
Cybersecurity and Infrastructure Security Agency<br>\n\
<a href=\"mailto:vulnerability@cisa.dhs.gov\">vulnerability@cisa.dhs.gov</a></p>\n";

const FOUO_NOTICE: &str = "WARNING: This message and any attached document(s) \
is FOR OFFICIAL USE ONLY (FOUO). It may contain information exempt from public \
release under the Freedom of Information Act (5 U.S.C. 552) and must be \
controlled, stored, handled, transmitted, distributed, and disposed of in \
accordance with CISA policy relating to FOUO information.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    pub subject: String,
    pub text_body: String,
    pub html_body: String,
}

/// Values substituted into a report template.
#[derive(Debug, Clone, Copy)]
pub struct ReportContext<'a> {
    pub acronym: &'a str,
    pub report_date: &'a str,
    pub federal: bool,
    pub kind: StakeholderKind,
    pub tech_pocs: &'a [Contact],
}

impl ReportContext<'_> {
    fn organization_noun(&self) -> &'static str {
        match self.kind {
            StakeholderKind::Federal => "agency",
            _ => "organization",
        }
    }
}

pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

pub fn render_report(category: ReportCategory, ctx: &ReportContext<'_>) -> Rendered {
    match category {
        ReportCategory::CyhyReport => cyhy_report(ctx),
        ReportCategory::TrustworthyMailReport => trustworthy_mail_report(ctx),
        ReportCategory::HttpsScanReport => https_report(ctx),
        ReportCategory::CybexScorecard => cybex_scorecard(ctx.report_date),
        ReportCategory::Notification => notification(ctx),
    }
}

fn html_document(paragraphs: &str) -> String {
    format!("<html>\n<head></head>\n<body>\n{paragraphs}</body>\n</html>\n")
}

fn cyhy_report(ctx: &ReportContext<'_>) -> Rendered {
    let acronym = ctx.acronym;
    let acronym_html = escape_html(acronym);

    let mut text = format!(
        "Greetings {acronym},\n\n\
         The Cyber Hygiene scan results are attached for your review. Same \
         password as before. (If this is your first report and you have yet \
         to receive a password, please let us know.)\n\n"
    );
    let mut html = format!(
        "<p>Greetings {acronym_html},</p>\n\n\
         <p>The Cyber Hygiene scan results are attached for your review. Same \
         password as before. (If this is your first report and you have yet \
         to receive a password, please let us know.)</p>\n\n"
    );

    if !ctx.tech_pocs.is_empty() {
        let _ = write!(
            text,
            "Note: we have the following Technical Points of Contact listed \
             for {acronym}:\n\n"
        );
        let _ = write!(
            html,
            "<p>Note: we have the following Technical Points of Contact \
             listed for {acronym_html}:</p>\n\n"
        );
        for poc in ctx.tech_pocs {
            let name = poc.name.as_deref().unwrap_or("(no name on file)");
            let _ = write!(text, "Name:  {name}\nEmail:  {}\n\n", poc.email);
            let _ = write!(
                html,
                "<p>\nName:  {}<br>\nEmail:  {}<br>\n</p>\n",
                escape_html(name),
                escape_html(&poc.email)
            );
        }
        let _ = write!(
            text,
            "Please request the report password from a Technical Point of \
             Contact and route all other requests through a Technical POC. \
             Should a Technical Point of Contact listed above no longer be \
             with {acronym}, please contact vulnerability@cisa.dhs.gov with \
             updated information.\n\n"
        );
        let _ = write!(
            html,
            "\n<p>Please request the report password from a Technical Point \
             of Contact and route all other requests through a Technical POC. \
             Should a Technical Point of Contact listed above no longer be \
             with {acronym_html}, please contact \
             <a href=\"mailto:vulnerability@cisa.dhs.gov\">vulnerability@cisa.dhs.gov</a> \
             with updated information.</p>\n\n"
        );
    }

    text.push_str("If you have any questions, please contact our office.\n\n");
    text.push_str(SIGNATURE_TEXT);
    let _ = write!(text, "\n{FOUO_NOTICE}\n");

    html.push_str("<p>If you have any questions, please contact our office.</p>\n\n");
    html.push_str(SIGNATURE_HTML);
    let _ = write!(html, "\n<p>{FOUO_NOTICE}</p>\n");

    Rendered {
        subject: format!(
            "{acronym} - Cyber Hygiene Report - {} Results",
            ctx.report_date
        ),
        text_body: text,
        html_body: html_document(&html),
    }
}

fn trustworthy_mail_report(ctx: &ReportContext<'_>) -> Rendered {
    let acronym = ctx.acronym;
    let acronym_html = escape_html(acronym);
    let date = ctx.report_date;
    let noun = ctx.organization_noun();

    let text = format!(
        "Greetings {acronym},\n\n\
         Attached is your Trustworthy Email Report. It presents your \
         {noun}'s support of SPF and DMARC, two email authentication \
         standards, as published at your domains. The data in this report \
         comes from a scan that took place on {date}.\n\n\
         Raw results, including error messages, are available as a CSV in \
         the appendix.\n\n\
         If you believe our reporting or methodology is in error, let us \
         know. We welcome your feedback and questions.\n\n\
         {SIGNATURE_TEXT}\n{FOUO_NOTICE}\n"
    );
    let html = format!(
        "<p>Greetings {acronym_html},</p>\n\
         <p>Attached is your <b>Trustworthy Email Report</b>. It presents \
         your {noun}'s support of SPF and DMARC, two email authentication \
         standards, as published at your domains. The data in this report \
         comes from a <b>scan that took place on {date}.</b></p>\n\
         <p>Raw results, including error messages, are available as a CSV \
         in the appendix.</p>\n\
         <p>If you believe our reporting or methodology is in error, let us \
         know. We welcome your feedback and questions.</p>\n\
         {SIGNATURE_HTML}\n<p>{FOUO_NOTICE}</p>\n"
    );

    Rendered {
        subject: format!("{acronym} - Trustworthy Email Report - {date} Results"),
        text_body: text,
        html_body: html_document(&html),
    }
}

fn https_report(ctx: &ReportContext<'_>) -> Rendered {
    let acronym = ctx.acronym;
    let acronym_html = escape_html(acronym);
    let date = ctx.report_date;
    let noun = ctx.organization_noun();

    let text = format!(
        "Greetings {acronym},\n\n\
         Attached is your HTTPS Report. It covers the second-level domains \
         your {noun} owns and many known subdomains, and reflects a scan \
         that took place on {date}.\n\n\
         If you believe our reporting or methodology is in error, let us \
         know. We welcome your feedback and questions.\n\n\
         {SIGNATURE_TEXT}\n{FOUO_NOTICE}\n"
    );
    let html = format!(
        "<p>Greetings {acronym_html},</p>\n\
         <p>Attached is your <b>HTTPS Report</b>. It covers the second-level \
         domains your {noun} owns and many known subdomains, and reflects a \
         <b>scan that took place on {date}.</b></p>\n\
         <p>If you believe our reporting or methodology is in error, let us \
         know. We welcome your feedback and questions.</p>\n\
         {SIGNATURE_HTML}\n<p>{FOUO_NOTICE}</p>\n"
    );

    Rendered {
        subject: format!("{acronym} - HTTPS Report - {date} Results"),
        text_body: text,
        html_body: html_document(&html),
    }
}

fn cybex_scorecard(date: &str) -> Rendered {
    let text = format!(
        "Greetings,\n\n\
         The Cyber Exposure scorecard from {date} is attached for your \
         review.\n\n\
         If you have any questions, please contact our office.\n\n\
         {SIGNATURE_TEXT}\n{FOUO_NOTICE}\n"
    );
    let html = format!(
        "<p>Greetings,</p>\n\n\
         <p>The Cyber Exposure scorecard from {date} is attached for your \
         review.</p>\n\n\
         <p>If you have any questions, please contact our office.</p>\n\n\
         {SIGNATURE_HTML}\n<p>{FOUO_NOTICE}</p>\n"
    );

    Rendered {
        subject: format!("Cyber Exposure Scorecard - {date} Results"),
        text_body: text,
        html_body: html_document(&html),
    }
}

/// Directive wording for federal stakeholders, recommendations otherwise.
fn notification(ctx: &ReportContext<'_>) -> Rendered {
    let acronym = ctx.acronym;
    let acronym_html = escape_html(acronym);

    let (remediation, known_exploited, interfaces) = if ctx.federal {
        (
            "As part of BOD 19-02, critical findings need to be remediated \
             within 15 days and high findings remediated within 30 days.",
            "As part of BOD 22-01, any known exploited findings, regardless \
             of severity, need to be remediated within two weeks.",
            Some(
                "As part of BOD 23-02, networked management interfaces exposed \
                 to the public internet must either be shut off or protected \
                 by a policy enforcement point separate from the interface \
                 itself within 14 days.",
            ),
        )
    } else {
        (
            "CISA recommends remediating critical findings within 15 days and \
             high findings within 30 days.",
            "CISA recommends remediating known exploited vulnerabilities, \
             regardless of severity, within two weeks.",
            None,
        )
    };
    let services = "CISA also recommends reviewing hosts with potentially \
                    risky open services (e.g. RDP, Telnet), especially if they \
                    are functioning as networked management interfaces, to \
                    ensure each service is intended to be public, up to date, \
                    correctly configured and protected by strong \
                    authentication.";

    let mut text = format!(
        "Greetings {acronym},\n\n\
         Cyber Hygiene scans of your host(s) conducted in the past day have \
         detected one or both of the following:\n\
         * New critical, high, and/or known exploited vulnerabilities\n\
         * New potentially risky services\n\n\
         {remediation}\n\n{known_exploited}\n\n{services}\n\n"
    );
    let mut html = format!(
        "<p>Greetings {acronym_html},</p>\n\n\
         <p>Cyber Hygiene scans of your host(s) conducted in the past day \
         have detected one or both of the following:</p>\n<ul>\n\
         <li>New critical, high, and/or known exploited vulnerabilities</li>\n\
         <li>New potentially risky services</li>\n</ul>\n\n\
         <p>{remediation}</p>\n\n<p>{known_exploited}</p>\n\n<p>{services}</p>\n\n"
    );
    if let Some(interfaces) = interfaces {
        let _ = write!(text, "{interfaces}\n\n");
        let _ = write!(html, "<p>{interfaces}</p>\n\n");
    }

    let _ = write!(
        text,
        "The details are in the attached PDF, which has the same password as \
         your weekly Cyber Hygiene Vulnerability Scanning report.\n\n\
         If you have any questions, please contact our office.\n\n\
         {SIGNATURE_TEXT}\n{FOUO_NOTICE}\n"
    );
    let _ = write!(
        html,
        "<p>The details are in the attached PDF, which has the same password \
         as your weekly Cyber Hygiene Vulnerability Scanning report.</p>\n\n\
         <p>If you have any questions, please contact our office.</p>\n\n\
         {SIGNATURE_HTML}\n<p>{FOUO_NOTICE}</p>\n"
    );

    Rendered {
        subject: format!("{acronym} - Cyber Hygiene Alert - {}", ctx.report_date),
        text_body: text,
        html_body: html_document(&html),
    }
}

/// Operator summary. `timestamp` is the end-of-run time.
pub fn render_summary(timestamp: &str, lines: &[String]) -> Rendered {
    let mut text = format!(
        "Greetings!\n\nHere is the cyhy-mailer summary from the run ending at \
         {timestamp}:\n"
    );
    let mut items = String::new();
    for line in lines {
        let _ = writeln!(text, "* {line}");
        let _ = writeln!(items, "<li>{}</li>", escape_html(line));
    }
    text.push_str("\nRegards,\nThe Cyber Hygiene development team\n");

    let html = format!(
        "<p>Greetings!</p>\n\n\
         <p>Here is the cyhy-mailer summary from the run ending at \
         {timestamp}:</p>\n<ul>\n{items}</ul>\n\n\
         <p>Regards,<br>\nThe Cyber Hygiene development team</p>\n"
    );

    Rendered {
        subject: format!("cyhy-mailer summary from {timestamp}"),
        text_body: text,
        html_body: html_document(&html),
    }
}
