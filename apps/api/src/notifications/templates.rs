//! Message bodies for the notifications the platform sends.

use chrono::{DateTime, Utc};

#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub subject: String,
    pub html_body: String,
    pub sms_body: Option<String>,
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn when(at: DateTime<Utc>, time_zone: &str) -> String {
    format!("{} ({time_zone})", at.format("%A, %B %-d, %Y at %H:%M UTC"))
}

pub fn interview_invitation(
    candidate_name: &str,
    interview_title: &str,
    organization_name: &str,
    message: Option<&str>,
    expires_at: DateTime<Utc>,
    link: &str,
) -> Notification {
    let note = message
        .filter(|m| !m.trim().is_empty())
        .map(|m| format!("<blockquote>{}</blockquote>", escape(m)))
        .unwrap_or_default();
    Notification {
        subject: format!("Interview Invitation: {interview_title}"),
        html_body: format!(
            "<p>Hi {name},</p>\
             <p>{org} has invited you to the interview <strong>{title}</strong>.</p>\
             {note}\
             <p>Please respond before {expires}.</p>\
             <p><a href=\"{link}\">View invitation</a></p>",
            name = escape(candidate_name),
            org = escape(organization_name),
            title = escape(interview_title),
            expires = expires_at.format("%B %-d, %Y"),
            link = escape(link),
        ),
        sms_body: None,
    }
}

pub fn interview_scheduled(
    candidate_name: &str,
    interview_title: &str,
    scheduled_at: DateTime<Utc>,
    duration_minutes: i32,
    time_zone: &str,
    meeting_link: Option<&str>,
) -> Notification {
    let link_html = meeting_link
        .map(|l| format!("<p>Meeting link: <a href=\"{0}\">{0}</a></p>", escape(l)))
        .unwrap_or_default();
    let slot = when(scheduled_at, time_zone);
    Notification {
        subject: format!("Interview Scheduled: {interview_title}"),
        html_body: format!(
            "<p>Hi {name},</p>\
             <p>Your interview <strong>{title}</strong> is scheduled for {slot} \
             and will last {duration_minutes} minutes.</p>\
             {link_html}",
            name = escape(candidate_name),
            title = escape(interview_title),
        ),
        sms_body: Some(format!(
            "TalentIQ: your interview \"{interview_title}\" is scheduled for {slot}."
        )),
    }
}

pub fn application_reviewed(
    candidate_name: &str,
    interview_title: &str,
    approved: bool,
) -> Notification {
    let outcome = if approved {
        "has been approved. You can now take the interview."
    } else {
        "was not selected to move forward at this time."
    };
    Notification {
        subject: format!("Application Update: {interview_title}"),
        html_body: format!(
            "<p>Hi {},</p><p>Your application for <strong>{}</strong> {outcome}</p>",
            escape(candidate_name),
            escape(interview_title),
        ),
        sms_body: None,
    }
}

pub fn technical_assignment(
    reviewer_name: &str,
    candidate_name: &str,
    interview_title: &str,
    scheduled_at: Option<DateTime<Utc>>,
) -> Notification {
    let slot = scheduled_at
        .map(|at| format!("<p>Scheduled for {}.</p>", when(at, "UTC")))
        .unwrap_or_default();
    Notification {
        subject: format!("Technical Interview Assigned: {candidate_name}"),
        html_body: format!(
            "<p>Hi {},</p>\
             <p>You have been assigned the technical interview of <strong>{}</strong> \
             for <strong>{}</strong>.</p>{slot}",
            escape(reviewer_name),
            escape(candidate_name),
            escape(interview_title),
        ),
        sms_body: None,
    }
}

/// Sent to the organization's recruiters and admins when an interviewer files feedback.
pub fn technical_feedback_received(
    staff_name: &str,
    candidate_name: &str,
    interviewer_name: &str,
    interview_title: &str,
    decision: &str,
) -> Notification {
    let decision = decision.replace('_', " ");
    Notification {
        subject: format!("Technical Interview Feedback Received - {candidate_name}"),
        html_body: format!(
            "<p>Hello {},</p>\
             <p>{} submitted technical interview feedback for <strong>{}</strong> \
             ({}).</p>\
             <p>Decision: <strong>{}</strong></p>",
            escape(staff_name),
            escape(interviewer_name),
            escape(candidate_name),
            escape(interview_title),
            escape(&decision),
        ),
        sms_body: None,
    }
}
