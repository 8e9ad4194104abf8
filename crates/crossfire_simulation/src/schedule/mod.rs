//! Combat clock + typed cancellable per-entity tasks.
//!
//! Архитектура:
//! - `CombatClock` двигается САМИМ тиком (fixed step), не wall time → детерминизм
//! - `ScheduledTasks` на entity: один pending task на `TaskKind`
//! - Планирование того же kind заменяет старый task (новый generation)
//! - `collect_due_tasks` превращает созревшие tasks в `TaskElapsed` events
//! - Отменённый task никогда не всплывёт; обработчики всё равно проверяют state

use bevy::prelude::*;

#[cfg(test)]
mod tasks_tests;

/// Допуск сравнения времени (накопление 1/60 в f64)
const TIME_EPSILON: f64 = 1e-9;

/// Минимальный интервал repeating task (защита от бесконечного цикла)
const MIN_REPEAT_INTERVAL: f64 = 1e-3;

/// Часы симуляции: tick counter + elapsed секунды
#[derive(Resource, Debug, Clone)]
pub struct CombatClock {
    tick: u64,
    elapsed: f64,
    step: f64,
}

impl Default for CombatClock {
    fn default() -> Self {
        Self::from_hz(60.0)
    }
}

impl CombatClock {
    pub fn from_hz(hz: f64) -> Self {
        Self {
            tick: 0,
            elapsed: 0.0,
            step: 1.0 / hz.max(1.0),
        }
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Текущее время симуляции (секунды)
    pub fn now(&self) -> f64 {
        self.elapsed
    }

    /// Длина одного тика (секунды)
    pub fn step(&self) -> f64 {
        self.step
    }

    pub fn advance(&mut self) {
        self.tick = self.tick.wrapping_add(1);
        self.elapsed += self.step;
    }
}

/// Тип отложенного действия
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Reflect)]
pub enum TaskKind {
    /// Повтор выстрела (автоматический огонь)
    AutomaticFire,
    /// Перенос патронов из резерва в магазин
    ReloadComplete,
    /// Sniper: затвор передёрнут, можно стрелять снова
    Rechamber,
    /// Бросивший гранату снова может бросать
    GrenadeCooldown,
    /// Детонация (на entity гранаты)
    GrenadeFuse,
    /// Повторная попытка связать комбатанта с клиентом
    ControllerRetry,
    /// Уход из матча после смерти
    Retire,
}

/// Handle запланированного task (kind + generation)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskHandle {
    pub kind: TaskKind,
    generation: u32,
}

#[derive(Debug, Clone)]
struct PendingTask {
    handle: TaskHandle,
    due: f64,
    repeat: Option<f64>,
}

/// Pending tasks одной entity
#[derive(Component, Debug, Clone, Default)]
pub struct ScheduledTasks {
    pending: Vec<PendingTask>,
    generation: u32,
}

impl ScheduledTasks {
    /// One-shot task через `delay` секунд. Заменяет pending task того же kind.
    pub fn schedule(&mut self, kind: TaskKind, now: f64, delay: f64) -> TaskHandle {
        self.insert(kind, now + delay.max(0.0), None)
    }

    /// Repeating task: первый раз через `interval`, далее каждые `interval`
    pub fn schedule_repeating(&mut self, kind: TaskKind, now: f64, interval: f64) -> TaskHandle {
        let interval = interval.max(MIN_REPEAT_INTERVAL);
        self.insert(kind, now + interval, Some(interval))
    }

    fn insert(&mut self, kind: TaskKind, due: f64, repeat: Option<f64>) -> TaskHandle {
        self.cancel_kind(kind);
        self.generation = self.generation.wrapping_add(1);
        let handle = TaskHandle {
            kind,
            generation: self.generation,
        };
        self.pending.push(PendingTask { handle, due, repeat });
        handle
    }

    /// Отмена конкретного handle (устаревший handle: no-op)
    pub fn cancel(&mut self, handle: TaskHandle) -> bool {
        let before = self.pending.len();
        self.pending.retain(|task| task.handle != handle);
        before != self.pending.len()
    }

    pub fn cancel_kind(&mut self, kind: TaskKind) -> bool {
        let before = self.pending.len();
        self.pending.retain(|task| task.handle.kind != kind);
        before != self.pending.len()
    }

    /// Отмена всего (смерть). Возвращает сколько отменено.
    pub fn cancel_all(&mut self) -> usize {
        let count = self.pending.len();
        self.pending.clear();
        count
    }

    pub fn is_pending(&self, kind: TaskKind) -> bool {
        self.pending.iter().any(|task| task.handle.kind == kind)
    }

    pub fn is_current(&self, handle: TaskHandle) -> bool {
        self.pending.iter().any(|task| task.handle == handle)
    }

    pub fn handle(&self, kind: TaskKind) -> Option<TaskHandle> {
        self.pending
            .iter()
            .find(|task| task.handle.kind == kind)
            .map(|task| task.handle)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Созревшие к `now` tasks (в порядке планирования).
    /// One-shot удаляются, repeating переносятся на следующий интервал.
    pub fn take_due(&mut self, now: f64) -> Vec<TaskHandle> {
        let mut due = Vec::new();
        self.pending.retain_mut(|task| {
            if task.due > now + TIME_EPSILON {
                return true;
            }
            match task.repeat {
                Some(interval) => {
                    while task.due <= now + TIME_EPSILON {
                        due.push(task.handle);
                        task.due += interval;
                    }
                    true
                }
                None => {
                    due.push(task.handle);
                    false
                }
            }
        });
        due
    }

    fn has_due(&self, now: f64) -> bool {
        self.pending.iter().any(|task| task.due <= now + TIME_EPSILON)
    }
}

/// Task созрел
#[derive(Event, Debug, Clone, Copy)]
pub struct TaskElapsed {
    pub entity: Entity,
    pub handle: TaskHandle,
}

impl TaskElapsed {
    pub fn kind(&self) -> TaskKind {
        self.handle.kind
    }
}

/// Первая система тика
pub fn advance_combat_clock(mut clock: ResMut<CombatClock>) {
    clock.advance();
}

/// Созревшие tasks → `TaskElapsed` (порядок: entity query order, внутри entity по порядку планирования)
pub fn collect_due_tasks(
    clock: Res<CombatClock>,
    mut tasks: Query<(Entity, &mut ScheduledTasks)>,
    mut elapsed: EventWriter<TaskElapsed>,
) {
    let now = clock.now();
    for (entity, mut scheduled) in tasks.iter_mut() {
        // Не трогаем change detection у entities без созревших tasks
        if !scheduled.has_due(now) {
            continue;
        }
        for handle in scheduled.take_due(now) {
            elapsed.write(TaskElapsed { entity, handle });
        }
    }
}
