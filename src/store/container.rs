//! The fitness store
//!
//! One `FitnessStore` holds every collection behind a Tokio `RwLock` and
//! publishes a `StoreEvent` for each mutation. Screens read from it, the
//! sync layer merges remote snapshots into it and the local mirror persists
//! a subset of it.

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::NaiveDate;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::{broadcast, RwLock};

use crate::store::error::{require_name, StoreError, StoreResult};
use crate::store::events::{Change, EventTarget, Origin, StoreEvent};
use crate::store::pending::PendingWrites;
use crate::store::record::{
    new_id, now_millis, with_record_type, CollectionKind, Collections, Record, Singleton,
    SingletonKind,
};
use crate::store::tracking::{
    BodyMeasurement, ProgressPhoto, Reminder, UnitSettings, UserProfile, WeeklyRecovery,
};
use crate::store::types::{
    DayOfWeek, TrainingBlock, WeeklyRoutine, Workout, WorkoutPlan, WorkoutTemplate,
};

/// Default broadcast buffer for change events
pub const DEFAULT_EVENT_CAPACITY: usize = 1024;

/// The template a routine schedules for a given day
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ScheduledWorkout {
    pub routine_id: String,
    pub routine_name: String,
    pub day: DayOfWeek,
    pub template_id: String,
    /// `None` when the routine points at a template that no longer exists
    pub template: Option<WorkoutTemplate>,
}

/// Record counts for health and status output
#[derive(Debug, Clone, Serialize, Default)]
pub struct StoreStats {
    pub counts: BTreeMap<String, usize>,
    pub total_records: usize,
    pub favorite_exercises: usize,
}

/// Next `updated_at` for a record last written at `previous`
///
/// Strictly increasing per record even when the clock does not advance.
fn next_timestamp(previous: i64) -> i64 {
    now_millis().max(previous + 1)
}

pub struct FitnessStore {
    state: RwLock<Collections>,
    events: broadcast::Sender<StoreEvent>,
    pending: PendingWrites,
}

impl Default for FitnessStore {
    fn default() -> Self {
        Self::new()
    }
}

impl FitnessStore {
    pub fn new() -> Self {
        Self::with_event_capacity(DEFAULT_EVENT_CAPACITY)
    }

    pub fn with_event_capacity(capacity: usize) -> Self {
        let (events, _) = broadcast::channel(capacity.max(1));
        Self {
            state: RwLock::new(Collections::default()),
            events,
            pending: PendingWrites::default(),
        }
    }

    /// Subscribe to change events
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    /// Local writes the sync layer has not pushed yet
    pub fn pending_writes(&self) -> &PendingWrites {
        &self.pending
    }

    /// Publish a change; callers hold the state write lock
    fn emit(&self, target: EventTarget, change: Change, origin: Origin) {
        let event = StoreEvent::new(target, change, origin);
        if event.is_local() {
            self.pending.mark(&event);
        }
        // No receivers is fine
        let _ = self.events.send(event);
    }

    // ========================================================================
    // Generic collection operations
    // ========================================================================

    /// Validate and insert a record, assigning a fresh id
    pub async fn add<T: Record>(&self, mut record: T) -> StoreResult<T> {
        record.check()?;
        record.set_id(new_id());
        record.set_updated_at(now_millis());

        let mut state = self.state.write().await;
        T::items_mut(&mut state).push(record.clone());
        tracing::debug!(collection = %T::KIND, id = record.id(), "Added record");
        self.emit(
            EventTarget::Collection(T::KIND),
            Change::Added {
                id: record.id().to_string(),
            },
            Origin::Local,
        );
        Ok(record)
    }

    /// Validate and replace the stored record with the same id
    pub async fn update<T: Record>(&self, mut record: T) -> StoreResult<T> {
        record.check()?;

        let mut state = self.state.write().await;
        let slot = T::items_mut(&mut state)
            .iter_mut()
            .find(|r| r.id() == record.id())
            .ok_or_else(|| StoreError::not_found(T::KIND.label(), record.id()))?;
        record.set_updated_at(next_timestamp(slot.updated_at()));
        *slot = record.clone();

        self.emit(
            EventTarget::Collection(T::KIND),
            Change::Updated {
                id: record.id().to_string(),
            },
            Origin::Local,
        );
        Ok(record)
    }

    /// Remove a record, returning it
    pub async fn delete<T: Record>(&self, id: &str) -> StoreResult<T> {
        let mut state = self.state.write().await;
        let items = T::items_mut(&mut state);
        let index = items
            .iter()
            .position(|r| r.id() == id)
            .ok_or_else(|| StoreError::not_found(T::KIND.label(), id))?;
        let removed = items.remove(index);

        tracing::debug!(collection = %T::KIND, id, "Deleted record");
        self.emit(
            EventTarget::Collection(T::KIND),
            Change::Removed { id: id.to_string() },
            Origin::Local,
        );
        Ok(removed)
    }

    pub async fn get<T: Record>(&self, id: &str) -> Option<T> {
        let state = self.state.read().await;
        T::items(&state).iter().find(|r| r.id() == id).cloned()
    }

    /// All records in insertion order
    pub async fn list<T: Record>(&self) -> Vec<T> {
        let state = self.state.read().await;
        T::items(&state).clone()
    }

    /// Swap out a whole collection
    ///
    /// Records keep their ids; records without one are given one.
    pub async fn replace_all<T: Record>(
        &self,
        mut records: Vec<T>,
        origin: Origin,
    ) -> StoreResult<usize> {
        for record in &mut records {
            record.check()?;
            if record.id().is_empty() {
                record.set_id(new_id());
            }
        }
        let count = records.len();

        let mut state = self.state.write().await;
        *T::items_mut(&mut state) = records;
        self.emit(
            EventTarget::Collection(T::KIND),
            Change::Replaced { count },
            origin,
        );
        Ok(count)
    }

    /// Apply `f` to one record, then re-validate and touch it
    async fn modify<T, F>(&self, id: &str, f: F) -> StoreResult<T>
    where
        T: Record,
        F: FnOnce(&mut T),
    {
        let mut state = self.state.write().await;
        let slot = T::items_mut(&mut state)
            .iter_mut()
            .find(|r| r.id() == id)
            .ok_or_else(|| StoreError::not_found(T::KIND.label(), id))?;

        let mut updated = slot.clone();
        f(&mut updated);
        updated.check()?;
        updated.set_updated_at(next_timestamp(slot.updated_at()));
        *slot = updated.clone();

        self.emit(
            EventTarget::Collection(T::KIND),
            Change::Updated { id: id.to_string() },
            Origin::Local,
        );
        Ok(updated)
    }

    // ========================================================================
    // Workouts
    // ========================================================================

    pub async fn add_workout(&self, workout: Workout) -> StoreResult<Workout> {
        self.add(workout).await
    }

    pub async fn update_workout(&self, workout: Workout) -> StoreResult<Workout> {
        self.update(workout).await
    }

    pub async fn delete_workout(&self, id: &str) -> StoreResult<Workout> {
        self.delete(id).await
    }

    pub async fn get_workout_by_id(&self, id: &str) -> Option<Workout> {
        self.get(id).await
    }

    /// Flip a workout between active and completed
    pub async fn toggle_workout_completion(&self, id: &str) -> StoreResult<Workout> {
        let now = now_millis();
        self.modify(id, |w: &mut Workout| {
            w.completed = !w.completed;
            w.completed_at = if w.completed { Some(now) } else { None };
        })
        .await
    }

    /// Record the start time of a workout; a second call keeps the first time
    pub async fn start_workout(&self, id: &str) -> StoreResult<Workout> {
        let now = now_millis();
        self.modify(id, |w: &mut Workout| {
            w.started_at.get_or_insert(now);
        })
        .await
    }

    /// Create and start a workout copied from a template
    pub async fn start_workout_from_template(
        &self,
        template_id: &str,
        date: NaiveDate,
    ) -> StoreResult<Workout> {
        let template: WorkoutTemplate = self
            .get(template_id)
            .await
            .ok_or_else(|| StoreError::not_found(CollectionKind::Templates.label(), template_id))?;

        let mut workout = template.instantiate(date);
        workout.started_at = Some(now_millis());
        self.add(workout).await
    }

    /// Workouts not yet completed, earliest first
    pub async fn active_workouts(&self) -> Vec<Workout> {
        let mut workouts: Vec<Workout> = self
            .list::<Workout>()
            .await
            .into_iter()
            .filter(|w| !w.completed)
            .collect();
        workouts.sort_by(|a, b| (a.date, a.scheduled_time).cmp(&(b.date, b.scheduled_time)));
        workouts
    }

    /// Completed workouts, most recent first
    pub async fn completed_workouts(&self) -> Vec<Workout> {
        let mut workouts: Vec<Workout> = self
            .list::<Workout>()
            .await
            .into_iter()
            .filter(|w| w.completed)
            .collect();
        workouts.sort_by(|a, b| b.date.cmp(&a.date).then(b.completed_at.cmp(&a.completed_at)));
        workouts
    }

    // ========================================================================
    // Templates, routines, plans, blocks
    // ========================================================================

    pub async fn add_template(&self, template: WorkoutTemplate) -> StoreResult<WorkoutTemplate> {
        self.add(template).await
    }

    pub async fn toggle_template_favorite(&self, id: &str) -> StoreResult<WorkoutTemplate> {
        self.modify(id, |t: &mut WorkoutTemplate| t.favorite = !t.favorite)
            .await
    }

    /// Mark a routine archived; archiving twice is a no-op change
    pub async fn archive_routine(&self, id: &str) -> StoreResult<WeeklyRoutine> {
        self.modify(id, |r: &mut WeeklyRoutine| r.archived = true).await
    }

    /// The most recently updated non-archived routine
    pub async fn active_routine(&self) -> Option<WeeklyRoutine> {
        let state = self.state.read().await;
        state
            .routines
            .iter()
            .filter(|r| !r.archived)
            .max_by_key(|r| r.updated_at)
            .cloned()
    }

    /// What the active routine schedules on `date`
    pub async fn todays_workout(&self, date: NaiveDate) -> Option<ScheduledWorkout> {
        let routine = self.active_routine().await?;
        let day = DayOfWeek::of(date);
        let template_id = routine.template_for(day)?.to_string();
        let template = self.get::<WorkoutTemplate>(&template_id).await;

        Some(ScheduledWorkout {
            routine_id: routine.id,
            routine_name: routine.name,
            day,
            template_id,
            template,
        })
    }

    /// Make one plan active and every other plan inactive
    pub async fn set_active_plan(&self, id: &str) -> StoreResult<WorkoutPlan> {
        let mut state = self.state.write().await;
        if !state.plans.iter().any(|p| p.id == id) {
            return Err(StoreError::not_found(CollectionKind::Plans.label(), id));
        }

        let mut changed = Vec::new();
        let mut activated = None;
        for plan in state.plans.iter_mut() {
            let should_be_active = plan.id == id;
            if plan.active != should_be_active {
                plan.active = should_be_active;
                plan.updated_at = next_timestamp(plan.updated_at);
                changed.push(plan.id.clone());
            }
            if should_be_active {
                activated = Some(plan.clone());
            }
        }

        for plan_id in changed {
            self.emit(
                EventTarget::Collection(CollectionKind::Plans),
                Change::Updated { id: plan_id },
                Origin::Local,
            );
        }
        activated.ok_or_else(|| StoreError::not_found(CollectionKind::Plans.label(), id))
    }

    /// Deactivate an active plan, or activate an inactive one
    pub async fn toggle_plan_active(&self, id: &str) -> StoreResult<WorkoutPlan> {
        let plan: WorkoutPlan = self
            .get(id)
            .await
            .ok_or_else(|| StoreError::not_found(CollectionKind::Plans.label(), id))?;

        if plan.active {
            self.modify(id, |p: &mut WorkoutPlan| p.active = false).await
        } else {
            self.set_active_plan(id).await
        }
    }

    pub async fn get_workout_plan(&self, id: &str) -> Option<WorkoutPlan> {
        self.get(id).await
    }

    pub async fn active_plan(&self) -> Option<WorkoutPlan> {
        let state = self.state.read().await;
        state.plans.iter().find(|p| p.active).cloned()
    }

    /// The latest-starting training block that contains `date`
    pub async fn current_training_block(&self, date: NaiveDate) -> Option<TrainingBlock> {
        let state = self.state.read().await;
        state
            .training_blocks
            .iter()
            .filter(|b| b.contains(date))
            .max_by_key(|b| b.start_date)
            .cloned()
    }

    // ========================================================================
    // Tracking
    // ========================================================================

    pub async fn add_body_measurement(
        &self,
        measurement: BodyMeasurement,
    ) -> StoreResult<BodyMeasurement> {
        self.add(measurement).await
    }

    /// Measurements ordered by date
    pub async fn body_measurements(&self) -> Vec<BodyMeasurement> {
        let mut measurements = self.list::<BodyMeasurement>().await;
        measurements.sort_by_key(|m| m.date);
        measurements
    }

    pub async fn add_progress_photo(&self, photo: ProgressPhoto) -> StoreResult<ProgressPhoto> {
        self.add(photo).await
    }

    /// Incomplete reminders due at or before `now`, oldest first
    pub async fn get_due_reminders(&self, now: i64) -> Vec<Reminder> {
        let mut due: Vec<Reminder> = self
            .list::<Reminder>()
            .await
            .into_iter()
            .filter(|r| r.is_due(now))
            .collect();
        due.sort_by_key(|r| r.due_at);
        due
    }

    pub async fn complete_reminder(&self, id: &str, now: i64) -> StoreResult<Reminder> {
        self.modify(id, |r: &mut Reminder| r.complete(now)).await
    }

    // ========================================================================
    // Favorites
    // ========================================================================

    pub async fn favorite_exercises(&self) -> Vec<String> {
        self.state.read().await.favorite_exercises.clone()
    }

    /// Add or remove an exercise name; returns whether it is now a favorite
    pub async fn toggle_favorite_exercise(&self, name: &str) -> StoreResult<bool> {
        require_name("exercise", name)?;
        let name = name.trim();

        let mut state = self.state.write().await;
        let favorites = &mut state.favorite_exercises;
        let now_favorite = match favorites.iter().position(|f| f == name) {
            Some(index) => {
                favorites.remove(index);
                false
            }
            None => {
                favorites.push(name.to_string());
                true
            }
        };

        self.emit(
            EventTarget::Favorites,
            Change::Replaced {
                count: favorites.len(),
            },
            Origin::Local,
        );
        Ok(now_favorite)
    }

    pub async fn set_favorite_exercises(&self, names: Vec<String>, origin: Origin) {
        let count = names.len();
        let mut state = self.state.write().await;
        state.favorite_exercises = names;
        self.emit(EventTarget::Favorites, Change::Replaced { count }, origin);
    }

    // ========================================================================
    // Singletons
    // ========================================================================

    async fn singleton<S: Singleton>(&self) -> S {
        let state = self.state.read().await;
        S::of(&state).clone()
    }

    /// Validate, touch and store a singleton as a local edit
    async fn put_singleton<S: Singleton>(&self, mut value: S) -> StoreResult<S> {
        value.check()?;
        let mut state = self.state.write().await;
        let slot = S::slot(&mut state);
        value.set_updated_at(next_timestamp(slot.updated_at()));
        *slot = value.clone();

        self.emit(
            EventTarget::Singleton(S::KIND),
            Change::Replaced { count: 1 },
            Origin::Local,
        );
        Ok(value)
    }

    /// Store a singleton as-is, without touching its timestamp
    pub async fn replace_singleton<S: Singleton>(&self, value: S, origin: Origin) -> StoreResult<()> {
        value.check()?;
        let mut state = self.state.write().await;
        *S::slot(&mut state) = value;
        self.emit(
            EventTarget::Singleton(S::KIND),
            Change::Replaced { count: 1 },
            origin,
        );
        Ok(())
    }

    pub async fn profile(&self) -> UserProfile {
        self.singleton().await
    }

    pub async fn set_profile(&self, profile: UserProfile) -> StoreResult<UserProfile> {
        self.put_singleton(profile).await
    }

    pub async fn set_deload_mode(&self, enabled: bool) -> StoreResult<UserProfile> {
        let mut profile = self.profile().await;
        profile.deload_mode = enabled;
        self.put_singleton(profile).await
    }

    pub async fn weekly_recovery(&self) -> WeeklyRecovery {
        self.singleton().await
    }

    pub async fn set_weekly_recovery(&self, recovery: WeeklyRecovery) -> StoreResult<WeeklyRecovery> {
        self.put_singleton(recovery).await
    }

    pub async fn unit_settings(&self) -> UnitSettings {
        self.singleton().await
    }

    pub async fn set_unit_settings(&self, settings: UnitSettings) -> StoreResult<UnitSettings> {
        self.put_singleton(settings).await
    }

    // ========================================================================
    // Document-level access for sync
    // ========================================================================

    /// Every record in a collection as `(id, json)`
    pub async fn documents(&self, kind: CollectionKind) -> StoreResult<Vec<(String, Value)>> {
        let state = self.state.read().await;
        with_record_type!(kind, T => {
            T::items(&state)
                .iter()
                .map(|r| -> StoreResult<(String, Value)> {
                    Ok((r.id().to_string(), serde_json::to_value(r)?))
                })
                .collect()
        })
    }

    /// One record as json, if it exists
    pub async fn document(&self, kind: CollectionKind, id: &str) -> StoreResult<Option<Value>> {
        let state = self.state.read().await;
        with_record_type!(kind, T => {
            match T::items(&state).iter().find(|r| r.id() == id) {
                Some(record) => Ok(Some(serde_json::to_value(record)?)),
                None => Ok(None),
            }
        })
    }

    /// A singleton as json
    pub async fn singleton_document(&self, kind: SingletonKind) -> StoreResult<Value> {
        let state = self.state.read().await;
        let value = match kind {
            SingletonKind::Profile => serde_json::to_value(&state.profile)?,
            SingletonKind::WeeklyRecovery => serde_json::to_value(&state.weekly_recovery)?,
            SingletonKind::UnitSettings => serde_json::to_value(&state.unit_settings)?,
        };
        Ok(value)
    }

    /// Merge a remote snapshot of one collection into the store
    ///
    /// Documents with a local write still in flight keep their local form;
    /// while the whole collection is being pushed the snapshot is ignored.
    /// Returns the collection size after the merge.
    pub async fn apply_remote_documents(
        &self,
        kind: CollectionKind,
        documents: Vec<(String, Value)>,
    ) -> StoreResult<usize> {
        with_record_type!(kind, T => {
            let remote = decode_documents::<T>(documents);
            Ok(self.merge_remote(remote).await)
        })
    }

    async fn merge_remote<T: Record>(&self, remote: Vec<T>) -> usize {
        let mut state = self.state.write().await;
        let items = T::items_mut(&mut state);
        let collection = T::KIND.remote_name();
        if self.pending.collection_pending(collection) {
            tracing::debug!(collection = %T::KIND, "Skipping snapshot during collection push");
            return items.len();
        }
        let pending = self.pending.document_ids(collection);
        let merged = merge_by_timestamp(items, remote, &pending);
        let count = merged.len();

        if *items != merged {
            *items = merged;
            self.emit(
                EventTarget::Collection(T::KIND),
                Change::Replaced { count },
                Origin::Remote,
            );
        }
        count
    }

    /// Apply a remote singleton unless the local copy is newer or pending
    ///
    /// Returns whether the local value changed.
    pub async fn apply_remote_singleton(&self, kind: SingletonKind, data: Value) -> StoreResult<bool> {
        match kind {
            SingletonKind::Profile => self.merge_singleton::<UserProfile>(data).await,
            SingletonKind::WeeklyRecovery => self.merge_singleton::<WeeklyRecovery>(data).await,
            SingletonKind::UnitSettings => self.merge_singleton::<UnitSettings>(data).await,
        }
    }

    async fn merge_singleton<S: Singleton>(&self, data: Value) -> StoreResult<bool> {
        let remote: S = serde_json::from_value(data)?;
        remote.check()?;

        let mut state = self.state.write().await;
        if self
            .pending
            .is_pending(S::KIND.remote_collection(), S::KIND.document_id())
        {
            return Ok(false);
        }
        let slot = S::slot(&mut state);
        if remote.updated_at() < slot.updated_at() || *slot == remote {
            return Ok(false);
        }
        *slot = remote;
        self.emit(
            EventTarget::Singleton(S::KIND),
            Change::Replaced { count: 1 },
            Origin::Remote,
        );
        Ok(true)
    }

    // ========================================================================
    // Whole-store operations
    // ========================================================================

    pub async fn snapshot(&self) -> Collections {
        self.state.read().await.clone()
    }

    /// Replace everything with `collections`
    ///
    /// Every record is validated first; on failure nothing changes.
    pub async fn restore(&self, mut collections: Collections, origin: Origin) -> StoreResult<()> {
        for &kind in CollectionKind::all() {
            with_record_type!(kind, T => {
                for record in T::items_mut(&mut collections).iter_mut() {
                    record.check()?;
                    if record.id().is_empty() {
                        record.set_id(new_id());
                    }
                }
            });
        }
        collections.profile.check()?;
        collections.weekly_recovery.check()?;
        collections.unit_settings.check()?;

        let mut state = self.state.write().await;
        *state = collections;
        for &kind in CollectionKind::all() {
            self.emit(
                EventTarget::Collection(kind),
                Change::Replaced {
                    count: state.count(kind),
                },
                origin,
            );
        }
        for &kind in SingletonKind::all() {
            self.emit(EventTarget::Singleton(kind), Change::Replaced { count: 1 }, origin);
        }
        self.emit(
            EventTarget::Favorites,
            Change::Replaced {
                count: state.favorite_exercises.len(),
            },
            origin,
        );
        tracing::info!(records = state.total_records(), "Restored store contents");
        Ok(())
    }

    /// Clear everything
    pub async fn reset(&self) {
        *self.state.write().await = Collections::default();
        self.emit(EventTarget::All, Change::Reset, Origin::System);
    }

    pub async fn stats(&self) -> StoreStats {
        let state = self.state.read().await;
        let counts = CollectionKind::all()
            .iter()
            .map(|&kind| (kind.to_string(), state.count(kind)))
            .collect();

        StoreStats {
            counts,
            total_records: state.total_records(),
            favorite_exercises: state.favorite_exercises.len(),
        }
    }
}

/// Decode remote documents, skipping any that fail to parse or validate
fn decode_documents<T: Record>(documents: Vec<(String, Value)>) -> Vec<T> {
    documents
        .into_iter()
        .filter_map(|(id, data)| {
            let mut record: T = match serde_json::from_value(data) {
                Ok(record) => record,
                Err(e) => {
                    tracing::warn!(collection = %T::KIND, id = %id, "Skipping undecodable document: {}", e);
                    return None;
                }
            };
            if let Err(e) = record.check() {
                tracing::warn!(collection = %T::KIND, id = %id, "Skipping invalid document: {}", e);
                return None;
            }
            record.set_id(id);
            Some(record)
        })
        .collect()
}

/// Last-write-wins merge of a remote snapshot into a local collection
///
/// - ids in `pending` keep their local form (or stay absent if deleted locally)
/// - otherwise the remote copy wins unless the local one is strictly newer
/// - local records missing remotely were deleted elsewhere and are dropped
///
/// Local order is kept; remote-only records follow in snapshot order.
pub fn merge_by_timestamp<T: Record>(
    local: &[T],
    remote: Vec<T>,
    pending: &HashSet<String>,
) -> Vec<T> {
    let mut remote_by_id: HashMap<String, T> = HashMap::with_capacity(remote.len());
    let mut remote_order = Vec::with_capacity(remote.len());
    for record in remote {
        let id = record.id().to_string();
        if remote_by_id.insert(id.clone(), record).is_none() {
            remote_order.push(id);
        }
    }

    let mut merged = Vec::with_capacity(local.len().max(remote_by_id.len()));
    for record in local {
        let id = record.id();
        let incoming = remote_by_id.remove(id);
        if pending.contains(id) {
            merged.push(record.clone());
            continue;
        }
        match incoming {
            Some(remote) if record.updated_at() > remote.updated_at() => merged.push(record.clone()),
            Some(remote) => merged.push(remote),
            None => {}
        }
    }

    for id in remote_order {
        if pending.contains(&id) {
            continue;
        }
        if let Some(record) = remote_by_id.remove(&id) {
            merged.push(record);
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::units::MassUnit;
    use crate::store::tracking::ReminderRepeat;
    use crate::store::types::Exercise;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn leg_day() -> Workout {
        Workout::new("Leg Day", date(2024, 3, 4))
            .exercise(Exercise::new("Squat").set(5, 100.0).set(5, 100.0))
    }

    #[tokio::test]
    async fn test_add_and_complete_workout() {
        let store = FitnessStore::new();

        let workout = store.add_workout(leg_day()).await.unwrap();
        assert!(!workout.id.is_empty());
        assert!(workout.updated_at > 0);

        let active = store.active_workouts().await;
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].name, "Leg Day");
        assert!(store.completed_workouts().await.is_empty());

        let done = store.toggle_workout_completion(&workout.id).await.unwrap();
        assert!(done.completed);
        assert!(done.completed_at.is_some());
        assert!(done.updated_at > workout.updated_at);
        assert!(store.active_workouts().await.is_empty());
        assert_eq!(store.completed_workouts().await.len(), 1);

        let undone = store.toggle_workout_completion(&workout.id).await.unwrap();
        assert!(!undone.completed);
        assert_eq!(undone.completed_at, None);
    }

    #[tokio::test]
    async fn test_add_assigns_fresh_ids() {
        let store = FitnessStore::new();
        let mut workout = leg_day();
        workout.id = "caller-chosen".to_string();

        let a = store.add_workout(workout.clone()).await.unwrap();
        let b = store.add_workout(workout).await.unwrap();
        assert_ne!(a.id, "caller-chosen");
        assert_ne!(a.id, b.id);
        assert_eq!(store.list::<Workout>().await.len(), 2);
    }

    #[tokio::test]
    async fn test_validation_rejects_without_change() {
        let store = FitnessStore::new();
        let mut rx = store.subscribe();

        let err = store
            .add_workout(Workout::new("", date(2024, 3, 4)))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
        assert!(store.list::<Workout>().await.is_empty());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_get_update_delete() {
        let store = FitnessStore::new();
        let workout = store.add_workout(leg_day()).await.unwrap();

        let mut edited = store.get_workout_by_id(&workout.id).await.unwrap();
        edited.notes = Some("felt strong".into());
        store.update_workout(edited).await.unwrap();
        assert_eq!(
            store.get_workout_by_id(&workout.id).await.unwrap().notes.as_deref(),
            Some("felt strong")
        );

        store.delete_workout(&workout.id).await.unwrap();
        assert!(store.get_workout_by_id(&workout.id).await.is_none());

        let err = store.delete_workout(&workout.id).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
        assert!(store.update_workout(leg_day()).await.is_err());
    }

    #[tokio::test]
    async fn test_events_are_local() {
        let store = FitnessStore::new();
        let mut rx = store.subscribe();

        let workout = store.add_workout(leg_day()).await.unwrap();
        let event = rx.recv().await.unwrap();
        assert_eq!(event.target, EventTarget::Collection(CollectionKind::Workouts));
        assert_eq!(event.change, Change::Added { id: workout.id.clone() });
        assert_eq!(event.origin, Origin::Local);

        store.delete_workout(&workout.id).await.unwrap();
        let event = rx.recv().await.unwrap();
        assert_eq!(event.change, Change::Removed { id: workout.id });
    }

    #[tokio::test]
    async fn test_start_from_template() {
        let store = FitnessStore::new();
        let template = store
            .add_template(
                WorkoutTemplate::new("Lower").exercise(Exercise::new("Deadlift").set(3, 140.0)),
            )
            .await
            .unwrap();

        let workout = store
            .start_workout_from_template(&template.id, date(2024, 3, 6))
            .await
            .unwrap();
        assert_eq!(workout.template_id.as_deref(), Some(template.id.as_str()));
        assert!(workout.started_at.is_some());
        assert_eq!(workout.set_count(), 1);

        assert!(store
            .start_workout_from_template("missing", date(2024, 3, 6))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_plan_activation_is_exclusive() {
        let store = FitnessStore::new();
        let a = store.add(WorkoutPlan::new("Strength")).await.unwrap();
        let b = store.add(WorkoutPlan::new("Hypertrophy")).await.unwrap();

        store.set_active_plan(&a.id).await.unwrap();
        store.set_active_plan(&b.id).await.unwrap();

        let plans = store.list::<WorkoutPlan>().await;
        assert_eq!(plans.iter().filter(|p| p.active).count(), 1);
        assert_eq!(store.active_plan().await.unwrap().id, b.id);

        let toggled = store.toggle_plan_active(&b.id).await.unwrap();
        assert!(!toggled.active);
        assert!(store.active_plan().await.is_none());

        let toggled = store.toggle_plan_active(&a.id).await.unwrap();
        assert!(toggled.active);
        assert_eq!(store.get_workout_plan(&a.id).await.unwrap().active, true);

        assert!(store.set_active_plan("missing").await.is_err());
    }

    #[tokio::test]
    async fn test_routine_archive_and_today() {
        let store = FitnessStore::new();
        let push = store.add_template(WorkoutTemplate::new("Push")).await.unwrap();

        let old = store
            .add(WeeklyRoutine::new("Old").day(DayOfWeek::Monday, "gone"))
            .await
            .unwrap();
        let current = store
            .add(WeeklyRoutine::new("PPL").day(DayOfWeek::Monday, push.id.clone()))
            .await
            .unwrap();

        // Monday
        let today = store.todays_workout(date(2024, 3, 4)).await.unwrap();
        assert_eq!(today.routine_id, current.id);
        assert_eq!(today.template.unwrap().name, "Push");
        assert!(store.todays_workout(date(2024, 3, 5)).await.is_none());

        let archived = store.archive_routine(&current.id).await.unwrap();
        assert!(archived.archived);
        assert_eq!(store.active_routine().await.unwrap().id, old.id);

        let dangling = store.todays_workout(date(2024, 3, 4)).await.unwrap();
        assert_eq!(dangling.template_id, "gone");
        assert!(dangling.template.is_none());
    }

    #[tokio::test]
    async fn test_current_training_block() {
        let store = FitnessStore::new();
        store
            .add(TrainingBlock::new("Base", date(2024, 1, 1), 8))
            .await
            .unwrap();
        let peak = store
            .add(TrainingBlock::new("Peak", date(2024, 2, 5), 2))
            .await
            .unwrap();

        assert_eq!(
            store.current_training_block(date(2024, 2, 6)).await.unwrap().id,
            peak.id
        );
        assert_eq!(
            store.current_training_block(date(2024, 1, 3)).await.unwrap().name,
            "Base"
        );
        assert!(store.current_training_block(date(2025, 1, 1)).await.is_none());
    }

    #[tokio::test]
    async fn test_reminders_due() {
        let store = FitnessStore::new();
        let daily = store
            .add(Reminder::new("Stretch", 1_000).repeat(ReminderRepeat::Daily))
            .await
            .unwrap();
        store.add(Reminder::new("Later", 50_000)).await.unwrap();

        let due = store.get_due_reminders(2_000).await;
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].id, daily.id);

        let completed = store.complete_reminder(&daily.id, 2_000).await.unwrap();
        assert!(completed.due_at > 2_000);
        assert!(store.get_due_reminders(2_000).await.is_empty());
    }

    #[tokio::test]
    async fn test_favorite_exercises() {
        let store = FitnessStore::new();
        assert!(store.toggle_favorite_exercise("Squat").await.unwrap());
        assert!(store.toggle_favorite_exercise("Bench").await.unwrap());
        assert_eq!(store.favorite_exercises().await, vec!["Squat", "Bench"]);
        assert!(!store.toggle_favorite_exercise("Squat").await.unwrap());
        assert_eq!(store.favorite_exercises().await, vec!["Bench"]);
        assert!(store.toggle_favorite_exercise(" ").await.is_err());
    }

    #[tokio::test]
    async fn test_singletons() {
        let store = FitnessStore::new();
        assert_eq!(store.unit_settings().await.mass, MassUnit::Kg);

        let settings = store
            .set_unit_settings(UnitSettings {
                mass: MassUnit::Lbs,
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(settings.updated_at > 0);
        assert_eq!(store.unit_settings().await.mass, MassUnit::Lbs);

        let profile = store.set_deload_mode(true).await.unwrap();
        assert!(profile.deload_mode);
        assert!(store.profile().await.deload_mode);

        let bad = WeeklyRecovery {
            energy: Some(11),
            ..Default::default()
        };
        assert!(store.set_weekly_recovery(bad).await.is_err());
    }

    #[tokio::test]
    async fn test_remote_singleton_last_write_wins() {
        let store = FitnessStore::new();
        let local = store
            .set_unit_settings(UnitSettings {
                mass: MassUnit::Lbs,
                ..Default::default()
            })
            .await
            .unwrap();

        let stale = serde_json::json!({"mass": "kg", "updated_at": local.updated_at - 10});
        assert!(!store
            .apply_remote_singleton(SingletonKind::UnitSettings, stale)
            .await
            .unwrap());
        assert_eq!(store.unit_settings().await.mass, MassUnit::Lbs);

        let fresh = serde_json::json!({"mass": "kg", "updated_at": local.updated_at + 10});
        assert!(store
            .apply_remote_singleton(SingletonKind::UnitSettings, fresh)
            .await
            .unwrap());
        assert_eq!(store.unit_settings().await.mass, MassUnit::Kg);
    }

    #[tokio::test]
    async fn test_pending_singleton_ignores_remote() {
        let store = FitnessStore::new();
        store.pending_writes().enable();
        let mut rx = store.subscribe();
        let local = store
            .set_unit_settings(UnitSettings {
                mass: MassUnit::Lbs,
                ..Default::default()
            })
            .await
            .unwrap();

        let fresh = serde_json::json!({"mass": "kg", "updated_at": local.updated_at + 10});
        assert!(!store
            .apply_remote_singleton(SingletonKind::UnitSettings, fresh.clone())
            .await
            .unwrap());
        assert_eq!(store.unit_settings().await.mass, MassUnit::Lbs);

        let event = rx.recv().await.unwrap();
        store.pending_writes().release(&event);
        assert!(store
            .apply_remote_singleton(SingletonKind::UnitSettings, fresh)
            .await
            .unwrap());
        assert_eq!(store.unit_settings().await.mass, MassUnit::Kg);
    }

    fn plan(id: &str, updated_at: i64) -> WorkoutPlan {
        let mut plan = WorkoutPlan::new(id.to_uppercase());
        plan.id = id.to_string();
        plan.updated_at = updated_at;
        plan
    }

    #[test]
    fn test_merge_rules() {
        let local = vec![plan("a", 10), plan("b", 50), plan("c", 10), plan("d", 10)];
        let remote = vec![plan("a", 20), plan("b", 40), plan("e", 5), plan("f", 5)];
        let pending: HashSet<String> = ["d".to_string(), "f".to_string()].into_iter().collect();

        let merged = merge_by_timestamp(&local, remote, &pending);
        let ids: Vec<(&str, i64)> = merged.iter().map(|p| (p.id.as_str(), p.updated_at)).collect();

        // a: remote newer; b: local newer; c: deleted remotely;
        // d: pending local add; e: new remotely; f: pending local delete
        assert_eq!(ids, vec![("a", 20), ("b", 50), ("d", 10), ("e", 5)]);
    }

    #[test]
    fn test_merge_tie_prefers_remote() {
        let mut remote_copy = plan("a", 10);
        remote_copy.name = "Remote".into();
        let merged = merge_by_timestamp(&[plan("a", 10)], vec![remote_copy], &HashSet::new());
        assert_eq!(merged[0].name, "Remote");
    }

    #[tokio::test]
    async fn test_apply_remote_documents() {
        let store = FitnessStore::new();
        let mut rx = store.subscribe();

        let docs = vec![
            (
                "w1".to_string(),
                serde_json::json!({"name": "Remote Push", "date": "2024-03-04", "updated_at": 5}),
            ),
            ("w2".to_string(), serde_json::json!({"name": "", "date": "2024-03-04"})),
            ("w3".to_string(), serde_json::json!({"garbage": true})),
        ];
        let count = store
            .apply_remote_documents(CollectionKind::Workouts, docs)
            .await
            .unwrap();
        assert_eq!(count, 1);

        let workout = store.get_workout_by_id("w1").await.unwrap();
        assert_eq!(workout.name, "Remote Push");

        let event = rx.recv().await.unwrap();
        assert_eq!(event.origin, Origin::Remote);

        // Identical snapshot produces no event
        let docs = store.documents(CollectionKind::Workouts).await.unwrap();
        store
            .apply_remote_documents(CollectionKind::Workouts, docs)
            .await
            .unwrap();
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_unpushed_add_survives_stale_snapshot() {
        let store = FitnessStore::new();
        store.pending_writes().enable();
        let mut rx = store.subscribe();

        // A snapshot taken before the add reaches the store after it
        let stale = vec![(
            "other".to_string(),
            serde_json::json!({"name": "Other Device", "date": "2024-03-04", "updated_at": 1}),
        )];
        let added = store.add_workout(leg_day()).await.unwrap();
        let count = store
            .apply_remote_documents(CollectionKind::Workouts, stale.clone())
            .await
            .unwrap();
        assert_eq!(count, 2);
        assert!(store.get_workout_by_id(&added.id).await.is_some());
        assert!(store.get_workout_by_id("other").await.is_some());

        // Once pushed, the remote copy decides again
        let event = rx.recv().await.unwrap();
        assert_eq!(event.change, Change::Added { id: added.id.clone() });
        store.pending_writes().release(&event);
        store
            .apply_remote_documents(CollectionKind::Workouts, stale)
            .await
            .unwrap();
        assert!(store.get_workout_by_id(&added.id).await.is_none());
    }

    #[tokio::test]
    async fn test_collection_push_defers_snapshots() {
        let store = FitnessStore::new();
        store.pending_writes().enable();
        store
            .replace_all(vec![plan("a", 10), plan("b", 10)], Origin::Local)
            .await
            .unwrap();

        let remote = vec![("c".to_string(), serde_json::json!({"name": "C", "updated_at": 1}))];
        assert_eq!(
            store
                .apply_remote_documents(CollectionKind::Plans, remote.clone())
                .await
                .unwrap(),
            2
        );
        assert!(store.get_workout_plan("c").await.is_none());

        store.pending_writes().clear();
        store
            .apply_remote_documents(CollectionKind::Plans, remote)
            .await
            .unwrap();
        assert!(store.get_workout_plan("c").await.is_some());
        assert!(store.get_workout_plan("a").await.is_none());
    }

    #[tokio::test]
    async fn test_marks_need_tracking() {
        let store = FitnessStore::new();
        store.add_workout(leg_day()).await.unwrap();
        assert!(store.pending_writes().is_empty());

        store.pending_writes().enable();
        store
            .replace_singleton(UnitSettings::default(), Origin::System)
            .await
            .unwrap();
        assert!(store.pending_writes().is_empty());
        store.set_deload_mode(true).await.unwrap();
        assert!(store.pending_writes().is_pending("profile", "info"));
    }

    #[tokio::test]
    async fn test_restore_and_reset() {
        let store = FitnessStore::new();
        store.add_workout(leg_day()).await.unwrap();
        store.toggle_favorite_exercise("Squat").await.unwrap();
        let snapshot = store.snapshot().await;

        let other = FitnessStore::new();
        other.restore(snapshot.clone(), Origin::Local).await.unwrap();
        assert_eq!(other.snapshot().await, snapshot);
        assert_eq!(other.stats().await.total_records, 1);

        let mut invalid = snapshot.clone();
        invalid.workouts[0].name = String::new();
        assert!(other.restore(invalid, Origin::Local).await.is_err());
        assert_eq!(other.snapshot().await, snapshot);

        let mut bad_recovery = snapshot.clone();
        bad_recovery.weekly_recovery.energy = Some(11);
        assert!(other.restore(bad_recovery, Origin::Local).await.is_err());

        // Every singleton is checked and restored
        let mut with_units = snapshot.clone();
        with_units.unit_settings.mass = MassUnit::Lbs;
        with_units.unit_settings.updated_at = 42;
        other.restore(with_units, Origin::Local).await.unwrap();
        assert_eq!(other.unit_settings().await.mass, MassUnit::Lbs);
        assert_eq!(other.unit_settings().await.updated_at, 42);

        let mut rx = other.subscribe();
        other.reset().await;
        assert_eq!(other.snapshot().await, Collections::default());
        let event = rx.recv().await.unwrap();
        assert_eq!(event.change, Change::Reset);
        assert_eq!(event.origin, Origin::System);
    }
}
