//! NPC behavior-tree primitives: roles, state machines, instructions,
//! sensors, and actions.
//!
//! Sensor and action evaluation has observable side effects (evaluating an
//! alarm sensor with `clear` set wipes the alarm). Every evaluation bumps a
//! global counter so tests can prove the inspector's walkers never invoke
//! one.

use std::any::Any;
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::components::{Alarm, Timer, TimerState};
use crate::introspect::{Introspect, ObjectRef, ReflectedValue, Reflection, Scalar};

static EVALUATIONS: AtomicU64 = AtomicU64::new(0);

/// Total sensor/action evaluations performed in this process.
#[must_use]
pub fn evaluation_count() -> u64 {
    EVALUATIONS.load(Ordering::Relaxed)
}

fn record_evaluation() {
    EVALUATIONS.fetch_add(1, Ordering::Relaxed);
}

// ---------------------------------------------------------------------------
// State machine
// ---------------------------------------------------------------------------

pub struct StateMachine {
    state: AtomicI32,
    sub_state: AtomicI32,
    state_name: Mutex<String>,
}

impl StateMachine {
    #[must_use]
    pub fn new(state: i32, sub_state: i32, state_name: impl Into<String>) -> Self {
        Self {
            state: AtomicI32::new(state),
            sub_state: AtomicI32::new(sub_state),
            state_name: Mutex::new(state_name.into()),
        }
    }

    #[must_use]
    pub fn state_index(&self) -> i32 {
        self.state.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn sub_state_index(&self) -> i32 {
        self.sub_state.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn state_name(&self) -> String {
        self.state_name.lock().clone()
    }

    pub fn transition(&self, state: i32, sub_state: i32, name: impl Into<String>) {
        self.state.store(state, Ordering::Relaxed);
        self.sub_state.store(sub_state, Ordering::Relaxed);
        *self.state_name.lock() = name.into();
    }
}

impl Default for StateMachine {
    fn default() -> Self {
        Self::new(0, 0, "idle")
    }
}

impl Introspect for StateMachine {
    fn type_name(&self) -> &str {
        "StateMachine"
    }

    fn reflect(&self) -> Reflection {
        Reflection::Fields(vec![
            ("state".into(), ReflectedValue::int(i64::from(self.state_index()))),
            (
                "subState".into(),
                ReflectedValue::int(i64::from(self.sub_state_index())),
            ),
            ("stateName".into(), ReflectedValue::str(self.state_name())),
        ])
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// ---------------------------------------------------------------------------
// Sensors
// ---------------------------------------------------------------------------

/// Common sensor state shared by every variant.
pub struct SensorBase {
    once: bool,
    triggered: AtomicBool,
}

impl SensorBase {
    #[must_use]
    pub fn new(once: bool) -> Self {
        Self {
            once,
            triggered: AtomicBool::new(false),
        }
    }

    #[must_use]
    pub fn once(&self) -> bool {
        self.once
    }

    #[must_use]
    pub fn triggered(&self) -> bool {
        self.triggered.load(Ordering::Relaxed)
    }

    fn mark_triggered(&self) {
        self.triggered.store(true, Ordering::Relaxed);
    }

    fn base_fields(&self) -> Vec<(String, ReflectedValue)> {
        vec![
            ("once".into(), ReflectedValue::bool(self.once())),
            ("triggered".into(), ReflectedValue::bool(self.triggered())),
        ]
    }
}

impl Default for SensorBase {
    fn default() -> Self {
        Self::new(false)
    }
}

/// A behavior-tree condition.
///
/// `evaluate` is the host's decision entry point and is *not* read-only:
/// alarm sensors configured with `clear` wipe their alarm when they fire.
pub trait Sensor: Introspect {
    fn once(&self) -> bool;
    fn triggered(&self) -> bool;
    fn evaluate(&self) -> bool;
}

/// The expected alarm state an alarm sensor waits for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlarmExpectation {
    Set,
    Passed,
    Unset,
}

impl AlarmExpectation {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Set => "SET",
            Self::Passed => "PASSED",
            Self::Unset => "UNSET",
        }
    }
}

/// Fires when a named alarm reaches the expected state.
pub struct SensorAlarm {
    base: SensorBase,
    alarm_name: String,
    expected: AlarmExpectation,
    clear: bool,
    alarm: Option<Arc<Alarm>>,
}

impl SensorAlarm {
    #[must_use]
    pub fn new(
        alarm_name: impl Into<String>,
        expected: AlarmExpectation,
        clear: bool,
        alarm: Option<Arc<Alarm>>,
    ) -> Self {
        Self {
            base: SensorBase::default(),
            alarm_name: alarm_name.into(),
            expected,
            clear,
            alarm,
        }
    }

    #[must_use]
    pub fn alarm_name(&self) -> &str {
        &self.alarm_name
    }

    #[must_use]
    pub fn expected(&self) -> AlarmExpectation {
        self.expected
    }

    #[must_use]
    pub fn alarm(&self) -> Option<&Arc<Alarm>> {
        self.alarm.as_ref()
    }
}

impl Introspect for SensorAlarm {
    fn type_name(&self) -> &str {
        "SensorAlarm"
    }

    fn reflect(&self) -> Reflection {
        let mut fields = self.base.base_fields();
        fields.push((
            "alarmName".into(),
            ReflectedValue::str(self.alarm_name.clone()),
        ));
        fields.push((
            "state".into(),
            ReflectedValue::Scalar(Scalar::Enum(self.expected.as_str().to_string())),
        ));
        fields.push(("clear".into(), ReflectedValue::bool(self.clear)));
        if let Some(alarm) = &self.alarm {
            fields.push((
                "alarm".into(),
                ReflectedValue::Object(alarm.clone() as ObjectRef),
            ));
        }
        Reflection::Fields(fields)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Sensor for SensorAlarm {
    fn once(&self) -> bool {
        self.base.once()
    }

    fn triggered(&self) -> bool {
        self.base.triggered()
    }

    fn evaluate(&self) -> bool {
        record_evaluation();
        let Some(alarm) = &self.alarm else {
            return false;
        };
        let fired = match self.expected {
            AlarmExpectation::Set => alarm.is_set(),
            AlarmExpectation::Passed => alarm.has_passed(),
            AlarmExpectation::Unset => !alarm.is_set() && !alarm.has_passed(),
        };
        if fired {
            self.base.mark_triggered();
            if self.clear {
                alarm.clear();
            }
        }
        fired
    }
}

/// Fires while a linked timer is in the expected state within a remaining
/// time window.
pub struct SensorTimer {
    base: SensorBase,
    min_time_remaining: f64,
    max_time_remaining: f64,
    expected: TimerState,
    timer: Arc<Timer>,
}

impl SensorTimer {
    #[must_use]
    pub fn new(
        min_time_remaining: f64,
        max_time_remaining: f64,
        expected: TimerState,
        timer: Arc<Timer>,
    ) -> Self {
        Self {
            base: SensorBase::default(),
            min_time_remaining,
            max_time_remaining,
            expected,
            timer,
        }
    }

    #[must_use]
    pub fn min_time_remaining(&self) -> f64 {
        self.min_time_remaining
    }

    #[must_use]
    pub fn max_time_remaining(&self) -> f64 {
        self.max_time_remaining
    }

    #[must_use]
    pub fn expected(&self) -> TimerState {
        self.expected
    }

    #[must_use]
    pub fn timer(&self) -> &Arc<Timer> {
        &self.timer
    }
}

impl Introspect for SensorTimer {
    fn type_name(&self) -> &str {
        "SensorTimer"
    }

    fn reflect(&self) -> Reflection {
        let mut fields = self.base.base_fields();
        fields.push((
            "minTimeRemaining".into(),
            ReflectedValue::float(self.min_time_remaining),
        ));
        fields.push((
            "maxTimeRemaining".into(),
            ReflectedValue::float(self.max_time_remaining),
        ));
        fields.push((
            "state".into(),
            ReflectedValue::Scalar(Scalar::Enum(self.expected.as_str().to_string())),
        ));
        fields.push((
            "timer".into(),
            ReflectedValue::Object(self.timer.clone() as ObjectRef),
        ));
        Reflection::Fields(fields)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Sensor for SensorTimer {
    fn once(&self) -> bool {
        self.base.once()
    }

    fn triggered(&self) -> bool {
        self.base.triggered()
    }

    fn evaluate(&self) -> bool {
        record_evaluation();
        let remaining = (self.timer.max_value() - self.timer.value()).max(0.0);
        let fired = self.timer.state() == self.expected
            && remaining >= self.min_time_remaining
            && remaining <= self.max_time_remaining;
        if fired {
            self.base.mark_triggered();
        }
        fired
    }
}

/// All child sensors must fire.
pub struct SensorAnd {
    base: SensorBase,
    sensors: Vec<Arc<dyn Sensor>>,
}

impl SensorAnd {
    #[must_use]
    pub fn new(sensors: Vec<Arc<dyn Sensor>>) -> Self {
        Self {
            base: SensorBase::default(),
            sensors,
        }
    }

    #[must_use]
    pub fn sensors(&self) -> &[Arc<dyn Sensor>] {
        &self.sensors
    }
}

impl Introspect for SensorAnd {
    fn type_name(&self) -> &str {
        "SensorAnd"
    }

    fn reflect(&self) -> Reflection {
        let mut fields = self.base.base_fields();
        fields.push((
            "sensors".into(),
            ReflectedValue::Sequence(
                self.sensors
                    .iter()
                    .map(|s| ReflectedValue::Object(s.clone() as ObjectRef))
                    .collect(),
            ),
        ));
        Reflection::Fields(fields)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Sensor for SensorAnd {
    fn once(&self) -> bool {
        self.base.once()
    }

    fn triggered(&self) -> bool {
        self.base.triggered()
    }

    fn evaluate(&self) -> bool {
        record_evaluation();
        let fired = self.sensors.iter().all(|s| s.evaluate());
        if fired {
            self.base.mark_triggered();
        }
        fired
    }
}

/// Any child sensor may fire.
pub struct SensorOr {
    base: SensorBase,
    sensors: Vec<Arc<dyn Sensor>>,
}

impl SensorOr {
    #[must_use]
    pub fn new(sensors: Vec<Arc<dyn Sensor>>) -> Self {
        Self {
            base: SensorBase::default(),
            sensors,
        }
    }

    #[must_use]
    pub fn sensors(&self) -> &[Arc<dyn Sensor>] {
        &self.sensors
    }
}

impl Introspect for SensorOr {
    fn type_name(&self) -> &str {
        "SensorOr"
    }

    fn reflect(&self) -> Reflection {
        let mut fields = self.base.base_fields();
        fields.push((
            "sensors".into(),
            ReflectedValue::Sequence(
                self.sensors
                    .iter()
                    .map(|s| ReflectedValue::Object(s.clone() as ObjectRef))
                    .collect(),
            ),
        ));
        Reflection::Fields(fields)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Sensor for SensorOr {
    fn once(&self) -> bool {
        self.base.once()
    }

    fn triggered(&self) -> bool {
        self.base.triggered()
    }

    fn evaluate(&self) -> bool {
        record_evaluation();
        let fired = self.sensors.iter().any(|s| s.evaluate());
        if fired {
            self.base.mark_triggered();
        }
        fired
    }
}

/// Inverts a single child sensor.
pub struct SensorNot {
    base: SensorBase,
    sensor: Arc<dyn Sensor>,
}

impl SensorNot {
    #[must_use]
    pub fn new(sensor: Arc<dyn Sensor>) -> Self {
        Self {
            base: SensorBase::default(),
            sensor,
        }
    }

    #[must_use]
    pub fn sensor(&self) -> &Arc<dyn Sensor> {
        &self.sensor
    }
}

impl Introspect for SensorNot {
    fn type_name(&self) -> &str {
        "SensorNot"
    }

    fn reflect(&self) -> Reflection {
        let mut fields = self.base.base_fields();
        fields.push((
            "sensor".into(),
            ReflectedValue::Object(self.sensor.clone() as ObjectRef),
        ));
        Reflection::Fields(fields)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Sensor for SensorNot {
    fn once(&self) -> bool {
        self.base.once()
    }

    fn triggered(&self) -> bool {
        self.base.triggered()
    }

    fn evaluate(&self) -> bool {
        record_evaluation();
        !self.sensor.evaluate()
    }
}

/// Always fires. Presented to clients as `Any`.
pub struct NullSensor {
    base: SensorBase,
}

impl NullSensor {
    #[must_use]
    pub fn new() -> Self {
        Self {
            base: SensorBase::default(),
        }
    }
}

impl Default for NullSensor {
    fn default() -> Self {
        Self::new()
    }
}

impl Introspect for NullSensor {
    fn type_name(&self) -> &str {
        "NullSensor"
    }

    fn reflect(&self) -> Reflection {
        Reflection::Fields(self.base.base_fields())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Sensor for NullSensor {
    fn once(&self) -> bool {
        self.base.once()
    }

    fn triggered(&self) -> bool {
        self.base.triggered()
    }

    fn evaluate(&self) -> bool {
        record_evaluation();
        self.base.mark_triggered();
        true
    }
}

/// A host sensor type the inspector has no dedicated handling for.
///
/// Carries arbitrary extra fields; the inspector's generic property
/// extraction decides which of them to surface.
pub struct GenericSensor {
    type_name: String,
    base: SensorBase,
    properties: Vec<(String, ReflectedValue)>,
}

impl GenericSensor {
    #[must_use]
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            base: SensorBase::default(),
            properties: Vec::new(),
        }
    }

    #[must_use]
    pub fn property(mut self, name: impl Into<String>, value: ReflectedValue) -> Self {
        self.properties.push((name.into(), value));
        self
    }
}

impl Introspect for GenericSensor {
    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn reflect(&self) -> Reflection {
        let mut fields = self.base.base_fields();
        fields.extend(self.properties.iter().cloned());
        Reflection::Fields(fields)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Sensor for GenericSensor {
    fn once(&self) -> bool {
        self.base.once()
    }

    fn triggered(&self) -> bool {
        self.base.triggered()
    }

    fn evaluate(&self) -> bool {
        record_evaluation();
        false
    }
}

// ---------------------------------------------------------------------------
// Actions
// ---------------------------------------------------------------------------

/// A behavior-tree effect executed when its instruction is selected.
pub trait Action: Introspect {
    fn perform(&self);
}

pub struct ActionSay {
    text: String,
}

impl ActionSay {
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

impl Introspect for ActionSay {
    fn type_name(&self) -> &str {
        "ActionSay"
    }

    fn reflect(&self) -> Reflection {
        Reflection::Fields(vec![("text".into(), ReflectedValue::str(self.text.clone()))])
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Action for ActionSay {
    fn perform(&self) {
        record_evaluation();
    }
}

pub struct ActionWander {
    radius: f64,
}

impl ActionWander {
    #[must_use]
    pub fn new(radius: f64) -> Self {
        Self { radius }
    }
}

impl Introspect for ActionWander {
    fn type_name(&self) -> &str {
        "ActionWander"
    }

    fn reflect(&self) -> Reflection {
        Reflection::Fields(vec![("radius".into(), ReflectedValue::float(self.radius))])
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Action for ActionWander {
    fn perform(&self) {
        record_evaluation();
    }
}

// ---------------------------------------------------------------------------
// Instructions
// ---------------------------------------------------------------------------

/// How an instruction combines its children.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeMode {
    Sequence,
    Selector,
    Random,
    Parallel,
}

impl TreeMode {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sequence => "SEQUENCE",
            Self::Selector => "SELECTOR",
            Self::Random => "RANDOM",
            Self::Parallel => "PARALLEL",
        }
    }
}

/// One node of a role's behavior tree.
pub struct Instruction {
    name: Option<String>,
    tag: Option<String>,
    continue_after: bool,
    tree_mode: TreeMode,
    weight: f64,
    sensor: Arc<dyn Sensor>,
    actions: Vec<Arc<dyn Action>>,
    children: Vec<Arc<Instruction>>,
}

impl Instruction {
    #[must_use]
    pub fn new(sensor: Arc<dyn Sensor>) -> Self {
        Self {
            name: None,
            tag: None,
            continue_after: false,
            tree_mode: TreeMode::Sequence,
            weight: 1.0,
            sensor,
            actions: Vec::new(),
            children: Vec::new(),
        }
    }

    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn tagged(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    #[must_use]
    pub fn continue_after(mut self, value: bool) -> Self {
        self.continue_after = value;
        self
    }

    #[must_use]
    pub fn tree_mode(mut self, mode: TreeMode) -> Self {
        self.tree_mode = mode;
        self
    }

    #[must_use]
    pub fn weighted(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    #[must_use]
    pub fn with_actions(mut self, actions: Vec<Arc<dyn Action>>) -> Self {
        self.actions = actions;
        self
    }

    #[must_use]
    pub fn with_children(mut self, children: Vec<Arc<Instruction>>) -> Self {
        self.children = children;
        self
    }

    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    #[must_use]
    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    #[must_use]
    pub fn is_continue_after(&self) -> bool {
        self.continue_after
    }

    #[must_use]
    pub fn get_tree_mode(&self) -> TreeMode {
        self.tree_mode
    }

    #[must_use]
    pub fn get_weight(&self) -> f64 {
        self.weight
    }

    #[must_use]
    pub fn get_sensor(&self) -> &Arc<dyn Sensor> {
        &self.sensor
    }

    #[must_use]
    pub fn get_actions(&self) -> &[Arc<dyn Action>] {
        &self.actions
    }

    #[must_use]
    pub fn get_children(&self) -> &[Arc<Instruction>] {
        &self.children
    }
}

impl Introspect for Instruction {
    fn type_name(&self) -> &str {
        "Instruction"
    }

    fn reflect(&self) -> Reflection {
        Reflection::Fields(vec![
            (
                "name".into(),
                self.name
                    .clone()
                    .map(ReflectedValue::str)
                    .unwrap_or_else(ReflectedValue::null),
            ),
            (
                "tag".into(),
                self.tag
                    .clone()
                    .map(ReflectedValue::str)
                    .unwrap_or_else(ReflectedValue::null),
            ),
            (
                "continueAfter".into(),
                ReflectedValue::bool(self.continue_after),
            ),
            (
                "treeMode".into(),
                ReflectedValue::Scalar(Scalar::Enum(self.tree_mode.as_str().to_string())),
            ),
            ("weight".into(), ReflectedValue::float(self.weight)),
            (
                "sensor".into(),
                ReflectedValue::Object(self.sensor.clone() as ObjectRef),
            ),
            (
                "actions".into(),
                ReflectedValue::Sequence(
                    self.actions
                        .iter()
                        .map(|a| ReflectedValue::Object(a.clone() as ObjectRef))
                        .collect(),
                ),
            ),
            (
                "children".into(),
                ReflectedValue::Sequence(
                    self.children
                        .iter()
                        .map(|c| ReflectedValue::Object(c.clone() as ObjectRef))
                        .collect(),
                ),
            ),
        ])
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// The wrapper the host stores trees under; `instructionList` carries the
/// real children.
pub struct InstructionWrapper {
    instruction_list: Vec<Arc<Instruction>>,
}

impl InstructionWrapper {
    #[must_use]
    pub fn new(instruction_list: Vec<Arc<Instruction>>) -> Self {
        Self { instruction_list }
    }

    #[must_use]
    pub fn empty() -> Self {
        Self {
            instruction_list: Vec::new(),
        }
    }

    #[must_use]
    pub fn instruction_list(&self) -> &[Arc<Instruction>] {
        &self.instruction_list
    }
}

impl Introspect for InstructionWrapper {
    fn type_name(&self) -> &str {
        "InstructionWrapper"
    }

    fn reflect(&self) -> Reflection {
        Reflection::Fields(vec![(
            "instructionList".into(),
            ReflectedValue::Sequence(
                self.instruction_list
                    .iter()
                    .map(|i| ReflectedValue::Object(i.clone() as ObjectRef))
                    .collect(),
            ),
        )])
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// ---------------------------------------------------------------------------
// Roles
// ---------------------------------------------------------------------------

/// An NPC's role: its behavior trees plus the state machine driving them.
pub struct Role {
    role_name: String,
    path: String,
    state_machine: Arc<StateMachine>,
    root_instruction: Arc<InstructionWrapper>,
    interaction_instruction: Arc<InstructionWrapper>,
    death_instruction: Arc<InstructionWrapper>,
}

impl Role {
    #[must_use]
    pub fn named(role_name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            role_name: role_name.into(),
            path: path.into(),
            state_machine: Arc::new(StateMachine::default()),
            root_instruction: Arc::new(InstructionWrapper::empty()),
            interaction_instruction: Arc::new(InstructionWrapper::empty()),
            death_instruction: Arc::new(InstructionWrapper::empty()),
        }
    }

    #[must_use]
    pub fn with_state_machine(mut self, state_machine: Arc<StateMachine>) -> Self {
        self.state_machine = state_machine;
        self
    }

    #[must_use]
    pub fn with_root(mut self, wrapper: Arc<InstructionWrapper>) -> Self {
        self.root_instruction = wrapper;
        self
    }

    #[must_use]
    pub fn with_interaction(mut self, wrapper: Arc<InstructionWrapper>) -> Self {
        self.interaction_instruction = wrapper;
        self
    }

    #[must_use]
    pub fn with_death(mut self, wrapper: Arc<InstructionWrapper>) -> Self {
        self.death_instruction = wrapper;
        self
    }

    #[must_use]
    pub fn get_role_name(&self) -> &str {
        &self.role_name
    }

    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    #[must_use]
    pub fn state_machine(&self) -> &Arc<StateMachine> {
        &self.state_machine
    }

    #[must_use]
    pub fn root_instruction(&self) -> &Arc<InstructionWrapper> {
        &self.root_instruction
    }

    #[must_use]
    pub fn interaction_instruction(&self) -> &Arc<InstructionWrapper> {
        &self.interaction_instruction
    }

    #[must_use]
    pub fn death_instruction(&self) -> &Arc<InstructionWrapper> {
        &self.death_instruction
    }
}

impl Introspect for Role {
    fn type_name(&self) -> &str {
        "Role"
    }

    fn reflect(&self) -> Reflection {
        Reflection::Fields(vec![
            ("path".into(), ReflectedValue::str(self.path.clone())),
            (
                "roleName".into(),
                ReflectedValue::str(self.role_name.clone()),
            ),
            (
                "stateMachine".into(),
                ReflectedValue::Object(self.state_machine.clone() as ObjectRef),
            ),
            (
                "rootInstruction".into(),
                ReflectedValue::Object(self.root_instruction.clone() as ObjectRef),
            ),
            (
                "interactionInstruction".into(),
                ReflectedValue::Object(self.interaction_instruction.clone() as ObjectRef),
            ),
            (
                "deathInstruction".into(),
                ReflectedValue::Object(self.death_instruction.clone() as ObjectRef),
            ),
        ])
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
