//! Leg day reminders
//!
//! Once the weekly alarm is due the scheduler nags: one reminder right away,
//! then one every `interval` until the user acknowledges. Delivery goes
//! through a chain of channels, first success wins.

use std::sync::Arc;
use std::time::Duration;

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Timelike, Weekday};
use legday_core::{LegDayError, LegDayResult};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Local wall-clock time
pub type WallTime = NaiveDateTime;

pub const REMINDER_TITLE: &str = "DON'T SKIP LEG DAY!";

pub const REMINDER_MESSAGES: [&str; 5] = [
    "It's time to verify those quads! Open the app NOW!",
    "DON'T IGNORE LEG DAY! Verify your quads immediately!",
    "Your legs are crying for attention! Verify NOW!",
    "WARNING: Skipping leg day detected! Time to verify.",
    "URGENT: Leg verification required immediately!",
];

/// Re-delivery period while a reminder is unacknowledged
pub const DEFAULT_REMINDER_INTERVAL: Duration = Duration::from_secs(10);

/// Weekly alarm: a weekday and a time of day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlarmSchedule {
    pub weekday: Weekday,
    pub hour: u32,
    pub minute: u32,
    pub active: bool,
}

impl Default for AlarmSchedule {
    fn default() -> Self {
        AlarmSchedule {
            weekday: Weekday::Mon,
            hour: 7,
            minute: 0,
            active: true,
        }
    }
}

impl AlarmSchedule {
    pub fn new(weekday: Weekday, hour: u32, minute: u32) -> LegDayResult<Self> {
        let alarm = AlarmSchedule {
            weekday,
            hour,
            minute,
            active: true,
        };
        alarm.validate()?;
        Ok(alarm)
    }

    pub fn validate(&self) -> LegDayResult<()> {
        self.time_of_day().map(|_| ())
    }

    pub fn time_of_day(&self) -> LegDayResult<NaiveTime> {
        NaiveTime::from_hms_opt(self.hour, self.minute, 0).ok_or_else(|| {
            LegDayError::InvalidConfig(format!(
                "alarm time {:02}:{:02} is not a time of day",
                self.hour, self.minute
            ))
        })
    }

    /// Active, right weekday, and at or past the alarm time
    pub fn is_due(&self, now: WallTime) -> bool {
        if !self.active || now.weekday() != self.weekday {
            return false;
        }
        (now.hour(), now.minute()) >= (self.hour, self.minute)
    }
}

impl std::fmt::Display for AlarmSchedule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {:02}:{:02}", self.weekday, self.hour, self.minute)?;
        if !self.active {
            write!(f, " (off)")?;
        }
        Ok(())
    }
}

/// Reminder scheduler configuration
#[derive(Debug, Clone, PartialEq)]
pub struct ReminderConfig {
    pub alarm: AlarmSchedule,
    /// Re-delivery period until acknowledged
    pub interval: Duration,
    /// Prefixed to every message when set
    pub user_name: Option<String>,
}

impl Default for ReminderConfig {
    fn default() -> Self {
        ReminderConfig {
            alarm: AlarmSchedule::default(),
            interval: DEFAULT_REMINDER_INTERVAL,
            user_name: None,
        }
    }
}

impl ReminderConfig {
    pub fn validate(&self) -> LegDayResult<()> {
        if self.interval.is_zero() {
            return Err(LegDayError::InvalidConfig(
                "reminder interval must be non-zero".into(),
            ));
        }
        self.alarm.validate()
    }
}

/// One notification
#[derive(Debug, Clone, PartialEq)]
pub struct Reminder {
    pub title: String,
    pub body: String,
    /// 1 for the first reminder of a nag, 2 for the next...
    pub sequence: u32,
    pub at: WallTime,
}

/// Somewhere a reminder can be shown
pub trait DeliveryChannel: Send {
    fn name(&self) -> &str;

    fn deliver(&self, reminder: &Reminder) -> LegDayResult<()>;
}

/// Writes reminders to the log
#[derive(Debug, Default, Clone, Copy)]
pub struct LogChannel;

impl DeliveryChannel for LogChannel {
    fn name(&self) -> &str {
        "log"
    }

    fn deliver(&self, reminder: &Reminder) -> LegDayResult<()> {
        info!(
            title = %reminder.title,
            body = %reminder.body,
            sequence = reminder.sequence,
            "reminder"
        );
        Ok(())
    }
}

/// Channel backed by a closure
pub struct FnChannel<F> {
    name: String,
    f: F,
}

impl<F> FnChannel<F>
where
    F: Fn(&Reminder) -> LegDayResult<()> + Send,
{
    pub fn new(name: impl Into<String>, f: F) -> Self {
        FnChannel {
            name: name.into(),
            f,
        }
    }
}

impl<F> DeliveryChannel for FnChannel<F>
where
    F: Fn(&Reminder) -> LegDayResult<()> + Send,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn deliver(&self, reminder: &Reminder) -> LegDayResult<()> {
        (self.f)(reminder)
    }
}

/// Ordered fallback list of channels
#[derive(Default)]
pub struct DeliveryChain {
    channels: Vec<Box<dyn DeliveryChannel>>,
}

impl DeliveryChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with<C: DeliveryChannel + 'static>(mut self, channel: C) -> Self {
        self.push(channel);
        self
    }

    pub fn push<C: DeliveryChannel + 'static>(&mut self, channel: C) {
        self.channels.push(Box::new(channel));
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Try each channel in order; returns the name of the one that took it
    pub fn deliver(&self, reminder: &Reminder) -> LegDayResult<&str> {
        for channel in &self.channels {
            match channel.deliver(reminder) {
                Ok(()) => return Ok(channel.name()),
                Err(e) => warn!(channel = channel.name(), error = %e, "delivery failed"),
            }
        }
        Err(LegDayError::AllChannelsFailed(self.channels.len()))
    }
}

impl std::fmt::Debug for DeliveryChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.channels.iter().map(|c| c.name()))
            .finish()
    }
}

#[derive(Debug, Clone, Copy)]
struct Nag {
    sequence: u32,
    last_attempt: WallTime,
}

/// Alarm check and nagging, driven by `poll`
#[derive(Debug)]
pub struct ReminderScheduler {
    config: ReminderConfig,
    chain: DeliveryChain,
    nag: Option<Nag>,
    acknowledged_on: Option<NaiveDate>,
    next_message: usize,
    sent: u64,
}

impl ReminderScheduler {
    pub fn new(config: ReminderConfig, chain: DeliveryChain) -> LegDayResult<Self> {
        config.validate()?;
        Ok(ReminderScheduler {
            config,
            chain,
            nag: None,
            acknowledged_on: None,
            next_message: 0,
            sent: 0,
        })
    }

    /// Start nagging now, regardless of the alarm
    pub fn trigger(&mut self, now: WallTime) -> LegDayResult<Reminder> {
        if self.nag.is_none() {
            info!(alarm = %self.config.alarm, "leg day reminder started");
        }
        self.nag = Some(Nag {
            sequence: 0,
            last_attempt: now,
        });
        self.deliver(now)
    }

    /// Fire the alarm if due, or re-deliver if the last attempt is an
    /// interval old. `Ok(None)` when nothing was due.
    pub fn poll(&mut self, now: WallTime) -> LegDayResult<Option<Reminder>> {
        match self.nag {
            Some(nag) => {
                let elapsed = (now - nag.last_attempt).to_std().unwrap_or(Duration::ZERO);
                if elapsed < self.config.interval {
                    return Ok(None);
                }
                self.deliver(now).map(Some)
            }
            None => {
                if !self.config.alarm.is_due(now) || self.acknowledged_on == Some(now.date()) {
                    return Ok(None);
                }
                self.trigger(now).map(Some)
            }
        }
    }

    /// Stop nagging. The alarm stays quiet for the rest of the day.
    /// Returns false when there was nothing to acknowledge.
    pub fn acknowledge(&mut self, now: WallTime) -> bool {
        let Some(nag) = self.nag.take() else {
            return false;
        };
        self.acknowledged_on = Some(now.date());
        info!(reminders = nag.sequence, "reminder acknowledged");
        true
    }

    /// Ready for the next alarm: any running nag stops, today's
    /// acknowledgement stays so the alarm does not fire again today
    pub fn rearm(&mut self) {
        if self.nag.take().is_some() {
            debug!("nag stopped on re-arm");
        }
    }

    /// Forget today's acknowledgement and any running nag
    pub fn reset(&mut self) {
        self.nag = None;
        self.acknowledged_on = None;
    }

    pub fn is_nagging(&self) -> bool {
        self.nag.is_some()
    }

    /// Successful deliveries since creation
    pub fn reminders_sent(&self) -> u64 {
        self.sent
    }

    pub fn config(&self) -> &ReminderConfig {
        &self.config
    }

    pub fn set_alarm(&mut self, alarm: AlarmSchedule) -> LegDayResult<()> {
        alarm.validate()?;
        self.config.alarm = alarm;
        Ok(())
    }

    fn compose(&mut self, sequence: u32, now: WallTime) -> Reminder {
        let message = REMINDER_MESSAGES[self.next_message % REMINDER_MESSAGES.len()];
        self.next_message = self.next_message.wrapping_add(1);

        let body = match self.config.user_name.as_deref() {
            Some(name) if !name.is_empty() => format!("Hey {}! {}", name, message),
            _ => message.to_string(),
        };
        Reminder {
            title: REMINDER_TITLE.to_string(),
            body,
            sequence,
            at: now,
        }
    }

    fn deliver(&mut self, now: WallTime) -> LegDayResult<Reminder> {
        let sequence = match self.nag.as_mut() {
            Some(nag) => {
                nag.sequence += 1;
                nag.last_attempt = now;
                nag.sequence
            }
            None => 1,
        };
        let reminder = self.compose(sequence, now);

        let channel = self.chain.deliver(&reminder)?;
        debug!(channel, sequence, "reminder delivered");
        self.sent += 1;
        Ok(reminder)
    }
}

type Clock = Arc<dyn Fn() -> WallTime + Send + Sync>;

/// Current local time
pub fn local_now() -> WallTime {
    chrono::Local::now().naive_local()
}

/// Runs a scheduler on a tokio interval
pub struct ReminderLoop;

impl ReminderLoop {
    /// Spawn against the local wall clock
    pub fn spawn(scheduler: ReminderScheduler) -> ReminderHandle {
        Self::spawn_with_clock(scheduler, local_now)
    }

    /// Spawn with an explicit wall clock. Polls every reminder interval.
    pub fn spawn_with_clock<C>(scheduler: ReminderScheduler, clock: C) -> ReminderHandle
    where
        C: Fn() -> WallTime + Send + Sync + 'static,
    {
        let period = scheduler.config().interval;
        let scheduler = Arc::new(Mutex::new(scheduler));
        let clock: Clock = Arc::new(clock);
        let (stop_tx, mut stop_rx) = oneshot::channel::<()>();

        let task = {
            let scheduler = scheduler.clone();
            let clock = clock.clone();
            tokio::spawn(async move {
                let mut interval = tokio::time::interval(period);
                interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

                loop {
                    tokio::select! {
                        biased;
                        _ = &mut stop_rx => break,
                        _ = interval.tick() => {
                            let now = clock();
                            if let Err(e) = scheduler.lock().poll(now) {
                                warn!(error = %e, "reminder not delivered, retrying next interval");
                            }
                        }
                    }
                }
                debug!("reminder loop stopped");
            })
        };

        ReminderHandle {
            scheduler,
            clock,
            stop_tx: Some(stop_tx),
            task: Some(task),
        }
    }
}

/// Control surface of a running reminder loop. Dropping it stops the loop.
pub struct ReminderHandle {
    scheduler: Arc<Mutex<ReminderScheduler>>,
    clock: Clock,
    stop_tx: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl ReminderHandle {
    /// Start nagging now
    pub fn trigger(&self) -> LegDayResult<Reminder> {
        let now = (self.clock)();
        self.scheduler.lock().trigger(now)
    }

    pub fn acknowledge(&self) -> bool {
        let now = (self.clock)();
        self.scheduler.lock().acknowledge(now)
    }

    pub fn reset(&self) {
        self.scheduler.lock().reset();
    }

    pub fn is_nagging(&self) -> bool {
        self.scheduler.lock().is_nagging()
    }

    pub fn reminders_sent(&self) -> u64 {
        self.scheduler.lock().reminders_sent()
    }

    /// Closure that re-arms this scheduler, for `HabitFlow::on_rearm`
    pub fn rearm_hook(&self) -> impl FnMut() + Send + 'static {
        let scheduler = self.scheduler.clone();
        move || scheduler.lock().rearm()
    }

    pub fn stop(&mut self) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
    }

    /// Stop the loop and wait for it to exit
    pub async fn shutdown(mut self) -> LegDayResult<()> {
        self.stop();
        match self.task.take() {
            Some(task) => task
                .await
                .map_err(|e| LegDayError::TaskFailed(e.to_string())),
            None => Ok(()),
        }
    }
}

impl Drop for ReminderHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// 2024-01-01 was a Monday
    fn monday(hour: u32, minute: u32, second: u32) -> WallTime {
        NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(hour, minute, second)
            .unwrap()
    }

    fn recording() -> (FnChannel<impl Fn(&Reminder) -> LegDayResult<()> + Send>, Arc<Mutex<Vec<Reminder>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = seen.clone();
        let channel = FnChannel::new("recording", move |r: &Reminder| {
            s.lock().push(r.clone());
            Ok(())
        });
        (channel, seen)
    }

    fn failing(name: &str) -> FnChannel<impl Fn(&Reminder) -> LegDayResult<()> + Send> {
        let owned = name.to_string();
        FnChannel::new(name, move |_: &Reminder| {
            Err(LegDayError::DeliveryFailed {
                channel: owned.clone(),
                reason: "unavailable".into(),
            })
        })
    }

    #[test]
    fn test_alarm_due() {
        let alarm = AlarmSchedule::new(Weekday::Mon, 7, 30).unwrap();

        assert!(!alarm.is_due(monday(7, 29, 59)));
        assert!(alarm.is_due(monday(7, 30, 0)));
        assert!(alarm.is_due(monday(23, 0, 0)));
        // Tuesday
        assert!(!alarm.is_due(monday(8, 0, 0) + chrono::Duration::days(1)));

        let off = AlarmSchedule {
            active: false,
            ..alarm
        };
        assert!(!off.is_due(monday(8, 0, 0)));
        assert_eq!(off.to_string(), "Mon 07:30 (off)");
    }

    #[test]
    fn test_invalid_alarm() {
        assert!(AlarmSchedule::new(Weekday::Fri, 24, 0).is_err());
        assert!(AlarmSchedule::new(Weekday::Fri, 6, 60).is_err());
    }

    #[test]
    fn test_nags_until_acknowledged() {
        let (channel, seen) = recording();
        let config = ReminderConfig {
            alarm: AlarmSchedule::new(Weekday::Mon, 7, 0).unwrap(),
            ..Default::default()
        };
        let mut scheduler = ReminderScheduler::new(config, DeliveryChain::new().with(channel)).unwrap();

        assert!(scheduler.poll(monday(6, 59, 0)).unwrap().is_none());
        let first = scheduler.poll(monday(7, 0, 0)).unwrap().unwrap();
        assert_eq!(first.sequence, 1);
        assert_eq!(first.title, REMINDER_TITLE);

        // Not yet an interval later
        assert!(scheduler.poll(monday(7, 0, 5)).unwrap().is_none());
        assert_eq!(scheduler.poll(monday(7, 0, 10)).unwrap().unwrap().sequence, 2);
        assert_eq!(scheduler.poll(monday(7, 0, 20)).unwrap().unwrap().sequence, 3);

        assert!(scheduler.acknowledge(monday(7, 0, 25)));
        assert!(scheduler.poll(monday(7, 0, 30)).unwrap().is_none());
        assert!(scheduler.poll(monday(9, 0, 0)).unwrap().is_none());
        assert_eq!(scheduler.reminders_sent(), 3);
        assert_eq!(seen.lock().len(), 3);

        // Next week the alarm fires again
        let next = monday(7, 0, 0) + chrono::Duration::weeks(1);
        assert!(scheduler.poll(next).unwrap().is_some());
    }

    #[test]
    fn test_messages_rotate_and_personalize() {
        let (channel, seen) = recording();
        let config = ReminderConfig {
            user_name: Some("Sam".into()),
            ..Default::default()
        };
        let mut scheduler = ReminderScheduler::new(config, DeliveryChain::new().with(channel)).unwrap();

        scheduler.trigger(monday(12, 0, 0)).unwrap();
        scheduler.poll(monday(12, 0, 10)).unwrap();

        let seen = seen.lock();
        assert_eq!(seen[0].body, format!("Hey Sam! {}", REMINDER_MESSAGES[0]));
        assert_eq!(seen[1].body, format!("Hey Sam! {}", REMINDER_MESSAGES[1]));
    }

    #[test]
    fn test_chain_falls_back() {
        let (channel, seen) = recording();
        let chain = DeliveryChain::new()
            .with(failing("push"))
            .with(channel)
            .with(LogChannel);
        let mut scheduler = ReminderScheduler::new(ReminderConfig::default(), chain).unwrap();

        scheduler.trigger(monday(7, 0, 0)).unwrap();
        assert_eq!(seen.lock().len(), 1);
        assert_eq!(scheduler.reminders_sent(), 1);
    }

    #[test]
    fn test_all_channels_failed_retries() {
        let attempts = Arc::new(AtomicU32::new(0));
        let a = attempts.clone();
        let flaky = FnChannel::new("flaky", move |_: &Reminder| {
            // Fails on the first attempt only
            if a.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(LegDayError::DeliveryFailed {
                    channel: "flaky".into(),
                    reason: "busy".into(),
                })
            } else {
                Ok(())
            }
        });
        let chain = DeliveryChain::new().with(failing("push")).with(flaky);
        let mut scheduler = ReminderScheduler::new(ReminderConfig::default(), chain).unwrap();

        let err = scheduler.trigger(monday(7, 0, 0)).unwrap_err();
        assert!(matches!(err, LegDayError::AllChannelsFailed(2)));
        assert!(scheduler.is_nagging());
        assert_eq!(scheduler.reminders_sent(), 0);

        let retried = scheduler.poll(monday(7, 0, 10)).unwrap().unwrap();
        assert_eq!(retried.sequence, 2);
        assert_eq!(scheduler.reminders_sent(), 1);
    }

    #[test]
    fn test_empty_chain_fails() {
        let mut scheduler =
            ReminderScheduler::new(ReminderConfig::default(), DeliveryChain::new()).unwrap();
        assert!(matches!(
            scheduler.trigger(monday(7, 0, 0)),
            Err(LegDayError::AllChannelsFailed(0))
        ));
    }

    #[test]
    fn test_rearm_keeps_todays_acknowledgement() {
        let mut scheduler =
            ReminderScheduler::new(ReminderConfig::default(), DeliveryChain::new().with(LogChannel))
                .unwrap();

        scheduler.poll(monday(7, 0, 0)).unwrap().unwrap();
        scheduler.acknowledge(monday(7, 1, 0));

        scheduler.rearm();
        assert!(scheduler.poll(monday(7, 5, 0)).unwrap().is_none());
        assert!(scheduler.poll(monday(23, 59, 0)).unwrap().is_none());
        assert_eq!(scheduler.reminders_sent(), 1);

        let next_week = monday(7, 0, 0) + chrono::Duration::days(7);
        assert!(scheduler.poll(next_week).unwrap().is_some());
    }

    #[test]
    fn test_rearm_stops_running_nag() {
        let mut scheduler =
            ReminderScheduler::new(ReminderConfig::default(), DeliveryChain::new().with(LogChannel))
                .unwrap();

        scheduler.trigger(monday(12, 0, 0)).unwrap();
        scheduler.rearm();
        assert!(!scheduler.is_nagging());
        assert!(scheduler.poll(monday(12, 0, 30)).unwrap().is_some());
    }

    #[test]
    fn test_reset_forgets_acknowledgement() {
        let mut scheduler =
            ReminderScheduler::new(ReminderConfig::default(), DeliveryChain::new().with(LogChannel))
                .unwrap();

        scheduler.poll(monday(7, 0, 0)).unwrap().unwrap();
        scheduler.acknowledge(monday(7, 1, 0));
        assert!(scheduler.poll(monday(7, 2, 0)).unwrap().is_none());

        scheduler.reset();
        assert!(scheduler.poll(monday(7, 3, 0)).unwrap().is_some());
    }

    #[test]
    fn test_zero_interval_rejected() {
        let config = ReminderConfig {
            interval: Duration::ZERO,
            ..Default::default()
        };
        assert!(ReminderScheduler::new(config, DeliveryChain::new()).is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reminder_loop_nags_and_stops() {
        let (channel, seen) = recording();
        let scheduler =
            ReminderScheduler::new(ReminderConfig::default(), DeliveryChain::new().with(channel))
                .unwrap();

        let start = tokio::time::Instant::now();
        let handle = ReminderLoop::spawn_with_clock(scheduler, move || {
            monday(7, 0, 0) + chrono::Duration::from_std(start.elapsed()).unwrap_or(chrono::Duration::zero())
        });

        // Ticks at 0s, 10s and 20s
        tokio::time::sleep(Duration::from_secs(25)).await;
        assert_eq!(handle.reminders_sent(), 3);
        assert!(handle.acknowledge());

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(seen.lock().len(), 3);
        handle.shutdown().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_rearm_hook_stays_quiet_for_the_day() {
        let scheduler =
            ReminderScheduler::new(ReminderConfig::default(), DeliveryChain::new().with(LogChannel))
                .unwrap();
        let handle = ReminderLoop::spawn_with_clock(scheduler, || monday(12, 0, 0));

        handle.trigger().unwrap();
        assert!(handle.is_nagging());
        assert!(handle.acknowledge());

        let mut rearm = handle.rearm_hook();
        rearm();
        assert!(!handle.is_nagging());

        // The loop keeps polling an alarm that is due, but today is done
        tokio::time::sleep(Duration::from_secs(35)).await;
        assert!(!handle.is_nagging());
        assert_eq!(handle.reminders_sent(), 1);
        handle.shutdown().await.unwrap();
    }
}
