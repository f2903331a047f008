use std::fmt::Write;

use crate::core::time::{format_clock, format_offset};
use crate::schemas::attempt::AttemptHistory;
use crate::services::exam_player::PlayerEvent;
use crate::services::session_launcher::ExamIntro;
use crate::session::status::QuestionStatus;
use crate::session::submission::{SubmissionReceipt, SubmissionSummary};
use crate::session::{QuestionView, SessionSnapshot};

pub(crate) fn intro(intro: &ExamIntro) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "== {} ==", intro.title);
    if let Some(description) = intro.description.as_deref().filter(|text| !text.is_empty()) {
        let _ = writeln!(out, "{description}");
    }
    let _ = writeln!(out, "Questions: {}", intro.question_count);
    let _ = writeln!(out, "Total points: {}", intro.total_points);
    let _ = writeln!(out, "Duration: {} min", intro.duration_minutes);
    let _ = writeln!(out, "{}", intro.negative_marking);
    if let Some(passing) = intro.passing_score {
        let _ = writeln!(out, "Passing score: {passing}");
    }
    match (intro.attempts_used, intro.attempts_allowed) {
        (Some(used), Some(allowed)) => {
            let _ = writeln!(out, "Attempts: {used} of {allowed} used");
        }
        (Some(used), None) => {
            let _ = writeln!(out, "Previous attempts: {used}");
        }
        _ => {}
    }
    out.push_str("The clock starts when you type 'start'.");
    out
}

pub(crate) fn question(view: &QuestionView<'_>, total: usize, remaining_seconds: u64) -> String {
    let mut out = String::new();
    let question = view.question;
    let _ = writeln!(
        out,
        "[{}] Question {} of {} ({} pt) - {}",
        format_clock(remaining_seconds),
        view.index + 1,
        total,
        question.points,
        view.status
    );
    if let Some(difficulty) = question.difficulty {
        let _ = writeln!(out, "Difficulty: {}", difficulty.as_str());
    }
    let _ = writeln!(out, "{}", question.text);

    let selected = view.answer.map(|answer| answer.displayed_index);
    for (index, option) in question.options.iter().enumerate() {
        let marker = if selected == Some(index) { "(*)" } else { "( )" };
        let _ = writeln!(out, "  {marker} {}. {}", index + 1, option.text);
    }
    out.pop();
    out
}

fn palette_symbol(status: QuestionStatus) -> char {
    match status {
        QuestionStatus::NotVisited => '.',
        QuestionStatus::Visited => 'o',
        QuestionStatus::Answered => '#',
        QuestionStatus::MarkedForReview { answered: false } => '?',
        QuestionStatus::MarkedForReview { answered: true } => '!',
    }
}

pub(crate) fn status(snapshot: &SessionSnapshot) -> String {
    let palette: Vec<String> = snapshot
        .statuses
        .iter()
        .enumerate()
        .map(|(index, status)| {
            let cursor = if index == snapshot.active_index { ">" } else { "" };
            format!("{cursor}{}{}", index + 1, palette_symbol(*status))
        })
        .collect();

    let answered = snapshot.statuses.iter().filter(|status| status.is_answered()).count();
    let marked = snapshot.statuses.iter().filter(|status| status.is_marked()).count();
    let clock = if snapshot.is_paused {
        format!("{} (paused)", format_clock(snapshot.remaining_seconds))
    } else {
        format_clock(snapshot.remaining_seconds)
    };

    format!(
        "{}\nanswered {answered}/{}  marked {marked}  time left {clock}  submission {}\n\
         legend: . not visited  o visited  # answered  ? marked  ! answered+marked",
        palette.join(" "),
        snapshot.question_count,
        snapshot.submission.as_str()
    )
}

pub(crate) fn summary(summary: &SubmissionSummary) -> String {
    format!(
        "Ready to submit: {} answered, {} skipped, {} marked for review (of {}).\n\
         Type 'confirm' to submit or 'cancel' to keep working.",
        summary.answered, summary.skipped, summary.marked, summary.total
    )
}

pub(crate) fn receipt(receipt: &SubmissionReceipt) -> String {
    let mut out = format!(
        "Submitted ({}) at {}.",
        receipt.trigger.as_str(),
        format_offset(receipt.submitted_at)
    );
    if let (Some(score), Some(max)) = (receipt.score, receipt.max_score) {
        let _ = write!(out, " Score: {score}/{max}.");
    }
    if let Some(attempt) = &receipt.attempt_id {
        let _ = write!(out, " Attempt id: {attempt}.");
    }
    out
}

pub(crate) fn history(history: &AttemptHistory) -> String {
    if history.attempts.is_empty() {
        return "No previous attempts.".to_string();
    }

    let mut out = String::new();
    for (position, attempt) in history.attempts.iter().enumerate() {
        let number = attempt.attempt_number.unwrap_or(position as u32 + 1);
        let score = match (attempt.score, attempt.max_score) {
            (Some(score), Some(max)) => format!("{score}/{max}"),
            (Some(score), None) => score.to_string(),
            _ => "-".to_string(),
        };
        let when = attempt.submitted_at.map(format_offset).unwrap_or_else(|| "-".to_string());
        let _ = write!(out, "#{number}  score {score}");
        if let Some(percentage) = attempt.percentage {
            let _ = write!(out, " ({percentage:.0}%)");
        }
        if let Some(seconds) = attempt.time_spent {
            let _ = write!(out, "  took {}", format_clock(seconds));
        }
        let _ = writeln!(out, "  submitted {when}");
    }
    let _ = write!(
        out,
        "best {}  average {}  attempts {}",
        history.stats.best_score,
        history.stats.average_score,
        history.attempts_used()
    );
    out
}

pub(crate) fn event(event: &PlayerEvent) -> String {
    match event {
        PlayerEvent::LowTime { remaining_seconds } => {
            format!("! Only {} left.", format_clock(*remaining_seconds))
        }
        PlayerEvent::TimeExpired => "! Time is up. Your answers are being submitted.".to_string(),
        PlayerEvent::Submitted(done) => receipt(done),
        PlayerEvent::SubmissionFailed(failure) => format!(
            "! Submission failed: {}. Your answers are kept; type 'retry' to send them again.",
            failure.message
        ),
    }
}
