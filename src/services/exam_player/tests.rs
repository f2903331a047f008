use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::time::{sleep, timeout, Duration};

use super::*;
use crate::core::config::Settings;
use crate::schemas::submission::{SubmitTrigger, NO_SELECTION};
use crate::session::SessionPhase;
use crate::test_support::{sample_session, FakeGradingService};

fn player_with(
    fake: Arc<FakeGradingService>,
    duration_minutes: u32,
) -> (ExamPlayer, mpsc::UnboundedReceiver<PlayerEvent>) {
    let settings = Settings::for_tests("http://localhost");
    ExamPlayer::new(sample_session(duration_minutes), fake, settings.session())
}

async fn next_event(events: &mut mpsc::UnboundedReceiver<PlayerEvent>) -> PlayerEvent {
    timeout(Duration::from_secs(3600), events.recv())
        .await
        .expect("event before timeout")
        .expect("event channel open")
}

#[tokio::test(start_paused = true)]
async fn timer_expiry_submits_once_with_sentinels() {
    let fake = Arc::new(FakeGradingService::new());
    let (player, mut events) = player_with(fake.clone(), 1);
    player.start().await.expect("start");
    player.select_option("q1", 1, "Na").await.expect("answer q1");
    player.go_to(1).await.expect("go to q2");
    player.mark_for_review("q2").await.expect("mark q2");

    assert_eq!(next_event(&mut events).await, PlayerEvent::LowTime { remaining_seconds: 59 });
    assert_eq!(next_event(&mut events).await, PlayerEvent::TimeExpired);
    let receipt = match next_event(&mut events).await {
        PlayerEvent::Submitted(receipt) => receipt,
        other => panic!("unexpected event {other:?}"),
    };
    assert_eq!(receipt.trigger, SubmitTrigger::Timeout);

    let submissions = fake.submissions();
    assert_eq!(submissions.len(), 1);
    let request = &submissions[0];
    assert_eq!(request.time_spent, 60);
    let selections: Vec<i32> =
        request.answers.iter().map(|answer| answer.selected_option).collect();
    assert_eq!(selections, vec![1, NO_SELECTION, NO_SELECTION]);

    assert_eq!(player.snapshot().await.phase, SessionPhase::Terminal);
    assert!(matches!(
        player.confirm_submit().await,
        Err(SubmitError::Session(SessionError::Terminal))
    ));
}

#[tokio::test(start_paused = true)]
async fn manual_submit_in_flight_wins_over_expiry() {
    let fake = Arc::new(FakeGradingService::new().with_submit_delay(Duration::from_secs(5)));
    let (player, mut events) = player_with(fake.clone(), 1);
    player.start().await.expect("start");

    sleep(Duration::from_secs(58)).await;
    player.request_submit().await.expect("confirming");
    let receipt = player.confirm_submit().await.expect("manual submission");
    assert_eq!(receipt.trigger, SubmitTrigger::Manual);

    let mut seen = Vec::new();
    while let Ok(event) = events.try_recv() {
        seen.push(event);
    }
    assert!(seen.contains(&PlayerEvent::TimeExpired));
    let submitted = seen.iter().filter(|event| matches!(event, PlayerEvent::Submitted(_))).count();
    assert_eq!(submitted, 1);

    sleep(Duration::from_secs(30)).await;
    assert_eq!(fake.submissions().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn failed_timeout_submission_waits_for_manual_retry() {
    let fake = Arc::new(FakeGradingService::new().failing_submits(1));
    let (player, mut events) = player_with(fake.clone(), 1);
    player.start().await.expect("start");

    loop {
        if let PlayerEvent::SubmissionFailed(failure) = next_event(&mut events).await {
            assert_eq!(failure.status, Some(502));
            break;
        }
    }

    sleep(Duration::from_secs(120)).await;
    assert_eq!(fake.submissions().len(), 1);
    assert_eq!(player.snapshot().await.phase, SessionPhase::InProgress);
    assert!(matches!(
        player.select_option("q1", 0, "S").await,
        Err(SessionError::TimeExpired)
    ));

    let receipt = player.retry_submission().await.expect("retry");
    assert_eq!(receipt.trigger, SubmitTrigger::Manual);
    assert_eq!(fake.submissions().len(), 2);
    assert_eq!(player.snapshot().await.phase, SessionPhase::Terminal);
}

#[tokio::test(start_paused = true)]
async fn exit_is_refused_while_submitting() {
    let fake = Arc::new(FakeGradingService::new().with_submit_delay(Duration::from_secs(5)));
    let (player, _events) = player_with(fake, 5);
    let player = Arc::new(player);
    player.start().await.expect("start");
    player.request_submit().await.expect("confirming");

    let submitting = {
        let player = player.clone();
        tokio::spawn(async move { player.confirm_submit().await })
    };
    sleep(Duration::from_secs(1)).await;
    assert_eq!(player.exit().await, Err(SessionError::SubmissionInFlight));

    submitting.await.expect("join").expect("submitted");
    assert!(player.exit().await.is_ok());
}

#[tokio::test(start_paused = true)]
async fn exit_stops_the_clock() {
    let fake = Arc::new(FakeGradingService::new());
    let (player, _events) = player_with(fake.clone(), 5);
    player.start().await.expect("start");

    sleep(Duration::from_millis(10_500)).await;
    player.exit().await.expect("exit");
    let remaining = player.snapshot().await.remaining_seconds;
    assert_eq!(remaining, 290);

    sleep(Duration::from_secs(600)).await;
    assert_eq!(player.snapshot().await.remaining_seconds, remaining);
    assert!(fake.submissions().is_empty());
}

#[tokio::test(start_paused = true)]
async fn dropping_the_player_cancels_the_clock() {
    let fake = Arc::new(FakeGradingService::new());
    let (player, mut events) = player_with(fake.clone(), 5);
    player.start().await.expect("start");
    sleep(Duration::from_secs(2)).await;
    drop(player);

    let closed = timeout(Duration::from_secs(3600), async {
        while let Some(event) = events.recv().await {
            assert!(!matches!(event, PlayerEvent::TimeExpired), "tick after drop");
        }
    })
    .await;
    assert!(closed.is_ok());
    assert!(fake.submissions().is_empty());
}

#[tokio::test(start_paused = true)]
async fn clock_loses_one_second_per_second() {
    let fake = Arc::new(FakeGradingService::new());
    let (player, _events) = player_with(fake.clone(), 1);
    player.start().await.expect("start");

    sleep(Duration::from_millis(16_500)).await;
    assert_eq!(player.snapshot().await.remaining_seconds, 44);
    assert!(fake.submissions().is_empty());

    sleep(Duration::from_secs(44)).await;
    let submissions = fake.submissions();
    assert_eq!(submissions.len(), 1);
    assert_eq!(submissions[0].time_spent, 60);
}

#[tokio::test(start_paused = true)]
async fn paused_player_keeps_its_time() {
    let fake = Arc::new(FakeGradingService::new());
    let (player, _events) = player_with(fake, 5);
    player.start().await.expect("start");

    sleep(Duration::from_millis(3_500)).await;
    player.pause().await.expect("pause");
    sleep(Duration::from_secs(30)).await;
    assert_eq!(player.snapshot().await.remaining_seconds, 297);

    player.resume().await.expect("resume");
    sleep(Duration::from_secs(2)).await;
    assert_eq!(player.snapshot().await.remaining_seconds, 295);
}
