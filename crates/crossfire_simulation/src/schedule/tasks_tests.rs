#[cfg(test)]
mod tests {
    use crate::schedule::*;

    #[test]
    fn test_one_shot_fires_once_at_due_time() {
        let mut tasks = ScheduledTasks::default();
        let handle = tasks.schedule(TaskKind::ReloadComplete, 1.0, 2.0);

        assert!(tasks.take_due(2.5).is_empty());
        assert_eq!(tasks.take_due(3.0), vec![handle]);
        assert!(tasks.take_due(10.0).is_empty());
        assert!(tasks.is_empty());
    }

    #[test]
    fn test_repeating_reschedules_from_due_time() {
        let mut tasks = ScheduledTasks::default();
        let handle = tasks.schedule_repeating(TaskKind::AutomaticFire, 0.0, 0.1);

        let mut fired = 0;
        let mut clock = CombatClock::from_hz(60.0);
        for _ in 0..60 {
            clock.advance();
            fired += tasks.take_due(clock.now()).len();
        }

        // 1 секунда / 0.1 интервал
        assert_eq!(fired, 10);
        assert!(tasks.is_current(handle));
    }

    #[test]
    fn test_rescheduling_same_kind_replaces_and_invalidates_old_handle() {
        let mut tasks = ScheduledTasks::default();
        let old = tasks.schedule(TaskKind::GrenadeCooldown, 0.0, 3.0);
        let new = tasks.schedule(TaskKind::GrenadeCooldown, 1.0, 3.0);

        assert_ne!(old, new);
        assert_eq!(tasks.len(), 1);
        assert!(!tasks.cancel(old), "stale handle cancel is a no-op");
        assert_eq!(tasks.take_due(3.5), Vec::<TaskHandle>::new());
        assert_eq!(tasks.take_due(4.0), vec![new]);
    }

    #[test]
    fn test_cancel_all_clears_everything() {
        let mut tasks = ScheduledTasks::default();
        tasks.schedule(TaskKind::ReloadComplete, 0.0, 2.0);
        tasks.schedule_repeating(TaskKind::AutomaticFire, 0.0, 0.1);
        tasks.schedule(TaskKind::Rechamber, 0.0, 1.0);

        assert_eq!(tasks.cancel_all(), 3);
        assert!(tasks.take_due(100.0).is_empty());
        assert!(!tasks.is_pending(TaskKind::ReloadComplete));
    }

    #[test]
    fn test_cancel_kind_only_touches_that_kind() {
        let mut tasks = ScheduledTasks::default();
        tasks.schedule(TaskKind::ReloadComplete, 0.0, 2.0);
        let auto = tasks.schedule_repeating(TaskKind::AutomaticFire, 0.0, 0.1);

        assert!(tasks.cancel_kind(TaskKind::ReloadComplete));
        assert!(!tasks.cancel_kind(TaskKind::ReloadComplete));
        assert_eq!(tasks.handle(TaskKind::AutomaticFire), Some(auto));
    }

    #[test]
    fn test_clock_is_tick_driven() {
        let mut clock = CombatClock::from_hz(50.0);
        assert_eq!(clock.tick(), 0);
        clock.advance();
        clock.advance();
        assert_eq!(clock.tick(), 2);
        assert!((clock.now() - 0.04).abs() < 1e-12);
    }
}
