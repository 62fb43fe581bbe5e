//! Run-to-completion execution of a definition.

use super::context::Context;
use super::observer::{Notice, Observer, TracingObserver};
use super::outcome::{EngineStatus, RunMode, RunOutcome, StopReason, TransitionOutcome};
use crate::config::MachineOptions;
use crate::core::{
    Action, Behavior, DefinitionId, Element, Event, Graph, HistoryLog, HistoryRecord,
    StateDefinition, StateId, StateMachineDefinition, TransitionId, TransitionKind,
};
use crate::error::{GraphError, MachineError, NO_TRANSITIONS, TOO_MANY_TRANSITIONS};
use serde_json::Value;
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// A transition waiting to be fired, with the arguments for its behaviors.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingTransition {
    pub transition: TransitionId,
    pub args: Vec<Value>,
}

/// Per-iteration callback of [`Machine::run_with`].
pub type RunHook<'h> = dyn FnMut(&mut Machine, &mut dyn Context) -> Result<(), MachineError> + 'h;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Phase {
    entry: bool,
    exit: bool,
    effect: bool,
    do_activity: bool,
}

#[derive(Debug, Clone, Copy)]
enum Target {
    State(StateId),
    Transition(TransitionId),
}

/// An independent execution of one definition.
///
/// Many machines may share one [`Graph`]. A machine only holds handles into
/// it, its queues and its history.
///
/// # Example
///
/// ```rust
/// use statewalk::builder::{GraphBuilder, TransitionBuilder};
/// use statewalk::engine::{Machine, RunMode};
/// use std::sync::Arc;
///
/// let graph = GraphBuilder::new("job")
///     .initial("queued")
///     .final_state("done")
///     .transition(TransitionBuilder::new().from("queued").to("done"))
///     .unwrap()
///     .build()
///     .unwrap();
///
/// let mut machine = Machine::new(Arc::new(graph));
/// machine.start(&mut (), &[]).unwrap();
/// machine.transition(&mut (), "queued->done", vec![]).unwrap();
/// machine.run(&mut (), RunMode::Continuous).unwrap();
///
/// assert!(machine.at_end());
/// assert_eq!(machine.history().len(), 2);
/// ```
pub struct Machine {
    id: Uuid,
    graph: Arc<Graph>,
    definition: DefinitionId,
    active: Option<StateId>,
    event_queue: VecDeque<Event>,
    transition_queue: Option<PendingTransition>,
    phase: Phase,
    running: bool,
    paused: bool,
    transition: Option<TransitionId>,
    last_transition: Option<TransitionId>,
    event: Option<Event>,
    trigger: Option<String>,
    history: HistoryLog,
    options: MachineOptions,
    observer: Arc<dyn Observer>,
}

impl Machine {
    /// Machine for the root definition of `graph`.
    pub fn new(graph: Arc<Graph>) -> Self {
        Self::with_options(graph, MachineOptions::default())
    }

    pub fn with_options(graph: Arc<Graph>, options: MachineOptions) -> Self {
        let definition = graph.root();
        Self::bound(graph, definition, options)
    }

    /// Machine for any definition of `graph`, nested ones included.
    pub fn for_definition(graph: Arc<Graph>, definition: DefinitionId) -> Result<Self, MachineError> {
        graph.definition(definition)?;
        Ok(Self::bound(graph, definition, MachineOptions::default()))
    }

    fn bound(graph: Arc<Graph>, definition: DefinitionId, options: MachineOptions) -> Self {
        Self {
            id: Uuid::new_v4(),
            graph,
            definition,
            active: None,
            event_queue: VecDeque::new(),
            transition_queue: None,
            phase: Phase::default(),
            running: false,
            paused: false,
            transition: None,
            last_transition: None,
            event: None,
            trigger: None,
            history: HistoryLog::new(),
            options,
            observer: Arc::new(TracingObserver),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn Observer>) -> Self {
        self.observer = observer;
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn graph(&self) -> &Arc<Graph> {
        &self.graph
    }

    /// Mutable access to the graph, cloning it first if it is shared.
    ///
    /// Removing the active state leaves the machine pointing at nothing.
    pub fn graph_mut(&mut self) -> &mut Graph {
        Arc::make_mut(&mut self.graph)
    }

    pub fn definition(&self) -> DefinitionId {
        self.definition
    }

    pub fn state_machine(&self) -> Result<&StateMachineDefinition, MachineError> {
        Ok(self.graph.definition(self.definition)?)
    }

    pub fn options(&self) -> &MachineOptions {
        &self.options
    }

    pub fn set_options(&mut self, options: MachineOptions) {
        self.options = options;
    }

    pub fn history(&self) -> &HistoryLog {
        &self.history
    }

    /// Active leaf state.
    pub fn active_state(&self) -> Option<StateId> {
        self.active
    }

    pub fn active_state_definition(&self) -> Option<&StateDefinition> {
        self.graph.state(self.active?).ok()
    }

    pub fn active_path(&self) -> Option<String> {
        self.active.map(|s| self.graph.path_of_state(s))
    }

    pub fn started(&self) -> bool {
        self.active.is_some()
    }

    /// True while the active state is the one `start` enters.
    pub fn at_start(&self) -> bool {
        let start = self
            .graph
            .definition(self.definition)
            .ok()
            .and_then(|d| d.start_state())
            .map(|s| self.graph.resolve_entry_target(s));
        start.is_some() && self.active == start
    }

    pub fn at_end(&self) -> bool {
        let end = self
            .graph
            .definition(self.definition)
            .ok()
            .and_then(|d| d.end_state());
        end.is_some() && self.active == end
    }

    /// True for the active leaf and each of its superstates.
    pub fn state_is_active(&self, state: StateId) -> bool {
        self.active
            .is_some_and(|active| self.graph.ancestors(active).contains(&state))
    }

    pub fn status(&self) -> EngineStatus {
        match (self.running, self.paused) {
            (false, _) => EngineStatus::Idle,
            (true, false) => EngineStatus::Running,
            (true, true) => EngineStatus::Paused,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn in_entry(&self) -> bool {
        self.phase.entry
    }

    pub fn in_exit(&self) -> bool {
        self.phase.exit
    }

    pub fn in_effect(&self) -> bool {
        self.phase.effect
    }

    pub fn in_do_activity(&self) -> bool {
        self.phase.do_activity
    }

    /// Transition currently being fired.
    pub fn transitioning(&self) -> Option<TransitionId> {
        self.transition
    }

    pub fn last_transition(&self) -> Option<TransitionId> {
        self.last_transition
    }

    pub fn pending_transition(&self) -> Option<&PendingTransition> {
        self.transition_queue.as_ref()
    }

    pub fn has_pending_transitions(&self) -> bool {
        self.transition_queue.is_some()
    }

    pub fn event_queue(&self) -> &VecDeque<Event> {
        &self.event_queue
    }

    /// Event being processed, if any.
    pub fn current_event(&self) -> Option<&Event> {
        self.event.as_ref()
    }

    /// Label of the trigger that matched the current event.
    pub fn trigger(&self) -> Option<&str> {
        self.trigger.as_deref()
    }

    fn notify(&self, notice: Notice) {
        self.observer.notify(self.id, &notice);
    }

    fn transition_paths(&self, transitions: &[TransitionId]) -> Vec<String> {
        transitions
            .iter()
            .map(|t| self.graph.path_of_transition(*t))
            .collect()
    }

    // behaviors

    fn invoke(
        &mut self,
        ctx: &mut dyn Context,
        action: Action,
        target: Target,
        args: &[Value],
    ) -> Result<Option<bool>, MachineError> {
        let graph = Arc::clone(&self.graph);
        let (element, own, owner) = match target {
            Target::State(id) => {
                let state = graph.state(id)?;
                (Element::State(state), state.behavior(action), state.owner())
            }
            Target::Transition(id) => {
                let transition = graph.transition(id)?;
                (
                    Element::Transition(transition),
                    transition.behavior(action),
                    transition.owner(),
                )
            }
        };

        let behavior = if own.is_none() {
            graph
                .definition(owner)?
                .option(action)
                .cloned()
                .unwrap_or_else(|| Behavior::named(action.key()))
        } else {
            own.clone()
        };

        match &behavior {
            Behavior::Callback(f) => f(self, ctx, element, args),
            Behavior::Named(name) if ctx.responds_to(name) => ctx.call(name, self, element, args),
            _ => Ok(None),
        }
    }

    /// A guard that gives no answer passes.
    fn guard(
        &mut self,
        ctx: &mut dyn Context,
        transition: TransitionId,
        args: &[Value],
    ) -> Result<bool, MachineError> {
        let passed = self
            .invoke(ctx, Action::Guard, Target::Transition(transition), args)?
            .unwrap_or(true);
        self.notify(Notice::GuardEvaluated { transition, passed });
        Ok(passed)
    }

    /// Ancestors of `state` that lie inside this machine's definition.
    fn scoped_ancestors(&self, state: StateId) -> Vec<StateId> {
        let graph = &self.graph;
        graph
            .ancestors(state)
            .into_iter()
            .take_while(|s| {
                graph
                    .state(*s)
                    .is_ok_and(|st| graph.is_within(st.owner(), self.definition))
            })
            .collect()
    }

    // lifecycle

    /// Enters the start state, running entry and doActivity behaviors, and
    /// resets the history to a single record.
    pub fn start(&mut self, ctx: &mut dyn Context, args: &[Value]) -> Result<StateId, MachineError> {
        let start = self
            .graph
            .definition(self.definition)?
            .start_state()
            .ok_or_else(|| MachineError::NoStartState {
                definition: self.graph.definition_label(self.definition),
            })?;
        self.active = None;
        let state = self.seed(ctx, start, args)?;
        self.notify(Notice::Started { state });
        Ok(state)
    }

    /// Forces the machine into `state` as if it had been started there.
    pub fn goto_state(
        &mut self,
        ctx: &mut dyn Context,
        state: StateId,
        args: &[Value],
    ) -> Result<StateId, MachineError> {
        let owner = self.graph.state(state)?.owner();
        if !self.graph.is_within(owner, self.definition) {
            return Err(GraphError::ForeignState {
                state: self.graph.path_of_state(state),
                definition: self.graph.definition_label(self.definition),
            }
            .into());
        }
        self.seed(ctx, state, args)
    }

    fn seed(&mut self, ctx: &mut dyn Context, state: StateId, args: &[Value]) -> Result<StateId, MachineError> {
        let entered = self.enter(ctx, state, None, args)?;
        self.history.clear();
        self.record_history(None, None, entered);
        Ok(entered)
    }

    /// Moves to `target`, rolling the active state back if any behavior fails.
    fn enter(
        &mut self,
        ctx: &mut dyn Context,
        target: StateId,
        via: Option<TransitionId>,
        args: &[Value],
    ) -> Result<StateId, MachineError> {
        let old = self.active;
        let saved = self.phase;
        let result = self.cascade(ctx, old, target, via, args);
        self.phase = saved;
        if result.is_err() {
            self.active = old;
            self.notify(Notice::RolledBack { state: old });
        }
        result
    }

    fn cascade(
        &mut self,
        ctx: &mut dyn Context,
        old: Option<StateId>,
        target: StateId,
        via: Option<TransitionId>,
        args: &[Value],
    ) -> Result<StateId, MachineError> {
        let graph = Arc::clone(&self.graph);
        let state = graph.resolve_entry_target(target);
        let external = match via {
            Some(t) => graph.transition(t)?.kind() == TransitionKind::External,
            None => true,
        };
        let from = old.map(|s| self.scoped_ancestors(s)).unwrap_or_default();
        let to = self.scoped_ancestors(state);
        let moved = old != Some(state);

        if self.phase.exit {
            return Err(MachineError::UnexpectedRecursion { operation: "exit" });
        }
        self.phase.exit = true;
        if old.is_some() && moved && external {
            // innermost first
            for s in from.iter().copied().filter(|s| !to.contains(s)) {
                self.notify(Notice::StateExited { state: s });
                self.invoke(ctx, Action::Exit, Target::State(s), args)?;
            }
        }
        self.phase.exit = false;

        self.active = Some(state);

        if self.phase.entry {
            return Err(MachineError::UnexpectedRecursion { operation: "entry" });
        }
        self.phase.entry = true;
        if moved && external {
            // outermost first
            for s in to.iter().rev().copied().filter(|s| !from.contains(s)) {
                self.notify(Notice::StateEntered { state: s });
                self.invoke(ctx, Action::Entry, Target::State(s), args)?;
            }
        }
        self.phase.entry = false;

        self.last_transition = via;
        self.transition = None;

        if self.phase.do_activity {
            return Err(MachineError::UnexpectedRecursion {
                operation: "doActivity",
            });
        }
        self.phase.do_activity = true;
        self.notify(Notice::ActivityInvoked { state });
        self.invoke(ctx, Action::DoActivity, Target::State(state), args)?;
        self.phase.do_activity = false;

        Ok(state)
    }

    fn record_history(
        &self,
        previous: Option<StateId>,
        transition: Option<TransitionId>,
        new_state: StateId,
    ) {
        if !self.options.record_history {
            return;
        }
        let mut record = HistoryRecord::new(previous, transition, new_state);
        record.event = self.event.clone();
        record.trigger = self.trigger.clone();
        record.data = self.options.history_data.clone();
        self.history.append(record);
    }

    // transition queue

    /// Queues `transition` without consulting its guard. It must leave the
    /// active state or one of its superstates.
    pub fn queue_transition(
        &mut self,
        transition: TransitionId,
        args: Vec<Value>,
    ) -> Result<(), MachineError> {
        if self.phase.entry || self.phase.exit || self.phase.effect {
            return Err(MachineError::UnexpectedRecursion {
                operation: "queue_transition",
            });
        }
        if let Some(pending) = &self.transition_queue {
            return Err(MachineError::TransitionPending {
                pending: self.graph.path_of_transition(pending.transition),
            });
        }
        if self.active.is_none() {
            return Err(MachineError::NotStarted);
        }
        self.graph.transition(transition)?;
        if self.at_end() {
            return Err(MachineError::CannotTransition {
                transition: self.graph.path_of_transition(transition),
                reason: "machine is at its end state".to_string(),
            });
        }
        if !self.candidates()?.contains(&transition) {
            return Err(MachineError::CannotTransition {
                transition: self.graph.path_of_transition(transition),
                reason: "does not leave the active state".to_string(),
            });
        }

        self.transition_queue = Some(PendingTransition { transition, args });
        self.notify(Notice::TransitionQueued { transition });
        Ok(())
    }

    fn fire_transition(
        &mut self,
        ctx: &mut dyn Context,
        pending: PendingTransition,
    ) -> Result<TransitionId, MachineError> {
        if self.transition.is_some() {
            return Err(MachineError::UnexpectedRecursion {
                operation: "fire_transition",
            });
        }
        let id = pending.transition;
        let target = self.graph.transition(id)?.target();
        let previous = self.active;

        self.transition = Some(id);
        let result = self.fire(ctx, id, target, previous, &pending.args);
        self.transition = None;
        self.phase.effect = false;
        result.map(|_| id)
    }

    fn fire(
        &mut self,
        ctx: &mut dyn Context,
        id: TransitionId,
        target: StateId,
        previous: Option<StateId>,
        args: &[Value],
    ) -> Result<(), MachineError> {
        if self.phase.effect {
            return Err(MachineError::UnexpectedRecursion { operation: "effect" });
        }
        self.phase.effect = true;
        self.notify(Notice::EffectInvoked { transition: id });
        self.invoke(ctx, Action::Effect, Target::Transition(id), args)?;
        self.phase.effect = false;

        let new_state = self.enter(ctx, target, Some(id), args)?;
        self.record_history(previous, Some(id), new_state);
        self.notify(Notice::TransitionFired {
            transition: id,
            from: previous,
            to: new_state,
        });
        Ok(())
    }

    fn process_transitions(
        &mut self,
        ctx: &mut dyn Context,
        mode: RunMode,
        mut hook: Option<&mut RunHook<'_>>,
    ) -> Result<(usize, StopReason), MachineError> {
        let mut fired = 0;
        if self.at_end() {
            return Ok((fired, StopReason::AtEnd));
        }
        if let Some(pending) = self.transition_queue.take() {
            self.fire_transition(ctx, pending)?;
            fired += 1;
            if mode == RunMode::Single {
                return Ok((fired, StopReason::SingleStep));
            }
        }
        loop {
            if self.paused {
                return Ok((fired, StopReason::Paused));
            }
            if self.at_end() {
                return Ok((fired, StopReason::AtEnd));
            }
            if let Some(hook) = hook.as_deref_mut() {
                hook(self, ctx)?;
            }
            let Some(pending) = self.transition_queue.take() else {
                return Ok((fired, StopReason::QueueEmpty));
            };
            self.fire_transition(ctx, pending)?;
            fired += 1;
            if mode == RunMode::Single {
                return Ok((fired, StopReason::SingleStep));
            }
        }
    }

    /// Fires queued transitions.
    ///
    /// A nested call from inside a behavior returns
    /// [`RunOutcome::AlreadyRunning`] and resumes the outer run if it was
    /// paused; the outer run picks up whatever the behavior queued.
    pub fn run(&mut self, ctx: &mut dyn Context, mode: RunMode) -> Result<RunOutcome, MachineError> {
        self.run_inner(ctx, mode, None)
    }

    /// Like [`run`](Self::run), calling `hook` before each attempt to fire.
    pub fn run_with<F>(
        &mut self,
        ctx: &mut dyn Context,
        mode: RunMode,
        mut hook: F,
    ) -> Result<RunOutcome, MachineError>
    where
        F: FnMut(&mut Machine, &mut dyn Context) -> Result<(), MachineError>,
    {
        let hook: &mut RunHook<'_> = &mut hook;
        self.run_inner(ctx, mode, Some(hook))
    }

    fn run_inner(
        &mut self,
        ctx: &mut dyn Context,
        mode: RunMode,
        hook: Option<&mut RunHook<'_>>,
    ) -> Result<RunOutcome, MachineError> {
        if self.running {
            return Ok(self.reenter());
        }
        self.running = true;
        self.paused = false;
        let result = self.process_transitions(ctx, mode, hook);
        self.running = false;
        self.paused = false;
        let (fired, stop) = result?;
        Ok(RunOutcome::Completed { fired, stop })
    }

    /// A nested run resumes a paused outer run and leaves the work to it.
    fn reenter(&mut self) -> RunOutcome {
        if self.paused {
            self.paused = false;
            self.notify(Notice::Resumed);
        }
        RunOutcome::AlreadyRunning
    }

    /// Makes the current run return once the active behavior finishes.
    pub fn pause(&mut self) -> Result<(), MachineError> {
        if !self.running {
            return Err(MachineError::UnexpectedRecursion { operation: "pause" });
        }
        self.paused = true;
        self.notify(Notice::Paused);
        Ok(())
    }

    pub fn resume(&mut self) -> Result<(), MachineError> {
        if !self.running {
            return Err(MachineError::UnexpectedRecursion { operation: "resume" });
        }
        self.paused = false;
        self.notify(Notice::Resumed);
        Ok(())
    }

    // events

    /// Appends `event` to the event queue.
    pub fn event(&mut self, event: impl Into<Event>) -> &mut Self {
        self.event_queue.push_back(event.into());
        self
    }

    /// Candidate transitions leaving the active state or its superstates,
    /// innermost first.
    fn candidates(&self) -> Result<Vec<TransitionId>, MachineError> {
        let active = self.active.ok_or(MachineError::NotStarted)?;
        self.candidates_from(active)
    }

    /// Outgoing transitions of `active` and its in-scope superstates.
    pub(crate) fn candidates_from(&self, active: StateId) -> Result<Vec<TransitionId>, MachineError> {
        let graph = &self.graph;
        let mut candidates = Vec::new();
        for state in self.scoped_ancestors(active) {
            for t in graph.state(state)?.outgoing() {
                // only targets inside the bound definition
                let target = graph.state(graph.transition(*t)?.target())?;
                if graph.is_within(target.owner(), self.definition) {
                    candidates.push(*t);
                }
            }
        }
        Ok(candidates)
    }

    /// Transitions with a trigger accepting `event` whose guard passes,
    /// paired with the matching trigger's label.
    pub fn transitions_matching_event(
        &mut self,
        ctx: &mut dyn Context,
        event: &Event,
    ) -> Result<Vec<(TransitionId, String)>, MachineError> {
        let graph = Arc::clone(&self.graph);
        let mut matches = Vec::new();
        for t in self.candidates()? {
            let Some(trigger) = graph.transition(t)?.matching_trigger(event) else {
                continue;
            };
            if self.guard(ctx, t, &event.args)? {
                matches.push((t, trigger.label().to_string()));
            }
        }
        Ok(matches)
    }

    /// Processes queued events one at a time, firing exactly one transition
    /// per event.
    ///
    /// An event no transition accepts, or more than one accepts, stops
    /// processing with [`MachineError::UnhandledEvent`]. The events behind it
    /// stay queued.
    pub fn run_events(&mut self, ctx: &mut dyn Context) -> Result<RunOutcome, MachineError> {
        if self.running {
            return Ok(self.reenter());
        }
        self.running = true;
        self.paused = false;
        let result = self.process_events(ctx);
        self.running = false;
        self.paused = false;
        self.event = None;
        self.trigger = None;
        let (fired, stop) = result?;
        Ok(RunOutcome::Completed { fired, stop })
    }

    fn process_events(&mut self, ctx: &mut dyn Context) -> Result<(usize, StopReason), MachineError> {
        let mut fired = 0;
        loop {
            if self.paused {
                return Ok((fired, StopReason::Paused));
            }
            let Some(event) = self.event_queue.pop_front() else {
                return Ok((fired, StopReason::QueueEmpty));
            };
            self.notify(Notice::EventDequeued {
                event: event.name.clone(),
            });
            self.event = Some(event.clone());

            let matches = self.transitions_matching_event(ctx, &event)?;
            let (transition, trigger) = match matches.as_slice() {
                [(t, trigger)] => (*t, trigger.clone()),
                [] => {
                    return Err(MachineError::UnhandledEvent {
                        message: NO_TRANSITIONS,
                        event: event.name,
                        candidates: Vec::new(),
                    })
                }
                many => {
                    let ids: Vec<TransitionId> = many.iter().map(|(t, _)| *t).collect();
                    return Err(MachineError::UnhandledEvent {
                        message: TOO_MANY_TRANSITIONS,
                        event: event.name,
                        candidates: self.transition_paths(&ids),
                    });
                }
            };

            self.trigger = Some(trigger);
            self.queue_transition(transition, event.args)?;
            let (n, _) = self.process_transitions(ctx, RunMode::Single, None)?;
            fired += n;
            self.event = None;
            self.trigger = None;
        }
    }

    /// Handles a single event immediately, reporting the outcome as data.
    ///
    /// From inside a behavior the selected transition is only queued.
    pub fn dispatch(
        &mut self,
        ctx: &mut dyn Context,
        event: impl Into<Event>,
    ) -> Result<TransitionOutcome, MachineError> {
        let event = event.into();
        if self.running {
            return self.select_and_queue(ctx, &event, TransitionOutcome::Queued);
        }

        self.event = Some(event.clone());
        let result = self.dispatch_now(ctx, &event);
        self.event = None;
        self.trigger = None;
        result
    }

    fn dispatch_now(
        &mut self,
        ctx: &mut dyn Context,
        event: &Event,
    ) -> Result<TransitionOutcome, MachineError> {
        let outcome = self.select_and_queue(ctx, event, TransitionOutcome::Fired)?;
        if let TransitionOutcome::Fired(_) = outcome {
            self.run_inner(ctx, RunMode::Single, None)?;
        }
        Ok(outcome)
    }

    fn select_and_queue(
        &mut self,
        ctx: &mut dyn Context,
        event: &Event,
        wrap: fn(TransitionId) -> TransitionOutcome,
    ) -> Result<TransitionOutcome, MachineError> {
        let matches = self.transitions_matching_event(ctx, event)?;
        match matches.as_slice() {
            [] => Ok(TransitionOutcome::Unhandled),
            [(t, trigger)] => {
                let t = *t;
                self.trigger = Some(trigger.clone());
                self.queue_transition(t, event.args.clone())?;
                Ok(wrap(t))
            }
            many => Ok(TransitionOutcome::Ambiguous(
                many.iter().map(|(t, _)| *t).collect(),
            )),
        }
    }

    // explicit selection

    /// Outgoing transitions of the active state (and its superstates) whose
    /// guard passes.
    pub fn valid_transitions(
        &mut self,
        ctx: &mut dyn Context,
        args: &[Value],
    ) -> Result<Vec<TransitionId>, MachineError> {
        let mut valid = Vec::new();
        for t in self.candidates()? {
            if self.guard(ctx, t, args)? {
                valid.push(t);
            }
        }
        Ok(valid)
    }

    pub fn has_valid_transition(
        &mut self,
        ctx: &mut dyn Context,
        args: &[Value],
    ) -> Result<bool, MachineError> {
        Ok(!self.valid_transitions(ctx, args)?.is_empty())
    }

    pub fn transitions_to(
        &mut self,
        ctx: &mut dyn Context,
        target: StateId,
        args: &[Value],
    ) -> Result<Vec<TransitionId>, MachineError> {
        let graph = Arc::clone(&self.graph);
        let mut found = Vec::new();
        for t in self.candidates()? {
            if graph.transition(t)?.target() == target && self.guard(ctx, t, args)? {
                found.push(t);
            }
        }
        Ok(found)
    }

    /// True when exactly one passing transition leads to `target`.
    pub fn can_transition_to(
        &mut self,
        ctx: &mut dyn Context,
        target: StateId,
        args: &[Value],
    ) -> Result<bool, MachineError> {
        Ok(self.transitions_to(ctx, target, args)?.len() == 1)
    }

    /// Queues the transition called `name`.
    pub fn transition(
        &mut self,
        ctx: &mut dyn Context,
        name: &str,
        args: Vec<Value>,
    ) -> Result<TransitionId, MachineError> {
        let graph = Arc::clone(&self.graph);
        let named: Vec<TransitionId> = self
            .candidates()?
            .into_iter()
            .filter(|t| graph.transition(*t).is_ok_and(|t| t.name() == name))
            .collect();
        if named.is_empty() {
            return Err(MachineError::UnknownTransition {
                name: name.to_string(),
                state: self.active_path().unwrap_or_default(),
            });
        }

        let mut passing = Vec::new();
        for t in named {
            if self.guard(ctx, t, &args)? {
                passing.push(t);
            }
        }
        match passing.as_slice() {
            [] => Err(MachineError::CannotTransition {
                transition: name.to_string(),
                reason: "guard rejected".to_string(),
            }),
            [t] => {
                let t = *t;
                self.queue_transition(t, args)?;
                Ok(t)
            }
            many => Err(MachineError::AmbiguousTransition {
                candidates: self.transition_paths(many),
            }),
        }
    }

    /// Queues `transition`, which must leave an active state and pass its guard.
    pub fn transition_by_id(
        &mut self,
        ctx: &mut dyn Context,
        transition: TransitionId,
        args: Vec<Value>,
    ) -> Result<TransitionId, MachineError> {
        let source = self.graph.transition(transition)?.source();
        let cannot = |reason: &str| MachineError::CannotTransition {
            transition: self.graph.path_of_transition(transition),
            reason: reason.to_string(),
        };
        if !self.candidates()?.contains(&transition) || !self.state_is_active(source) {
            return Err(cannot("source state is not active"));
        }
        if !self.guard(ctx, transition, &args)? {
            return Err(MachineError::CannotTransition {
                transition: self.graph.path_of_transition(transition),
                reason: "guard rejected".to_string(),
            });
        }
        self.queue_transition(transition, args)?;
        Ok(transition)
    }

    /// Queues the only passing transition into `target`.
    pub fn transition_to(
        &mut self,
        ctx: &mut dyn Context,
        target: StateId,
        args: Vec<Value>,
    ) -> Result<TransitionId, MachineError> {
        let found = self.transitions_to(ctx, target, &args)?;
        match found.as_slice() {
            [] => Err(MachineError::UnknownTransition {
                name: format!("to {}", self.graph.path_of_state(target)),
                state: self.active_path().unwrap_or_default(),
            }),
            [t] => {
                let t = *t;
                self.queue_transition(t, args)?;
                Ok(t)
            }
            many => Err(MachineError::AmbiguousTransition {
                candidates: self.transition_paths(many),
            }),
        }
    }

    /// Queues the only passing outgoing transition.
    pub fn transition_to_next_state(
        &mut self,
        ctx: &mut dyn Context,
        args: Vec<Value>,
    ) -> Result<TransitionId, MachineError> {
        let valid = self.valid_transitions(ctx, &args)?;
        match valid.as_slice() {
            [] => Err(MachineError::UnknownTransition {
                name: "next state".to_string(),
                state: self.active_path().unwrap_or_default(),
            }),
            [t] => {
                let t = *t;
                self.queue_transition(t, args)?;
                Ok(t)
            }
            many => Err(MachineError::AmbiguousTransition {
                candidates: self.transition_paths(many),
            }),
        }
    }

    /// Like [`transition_to_next_state`](Self::transition_to_next_state) but
    /// yields `None` when there is no unique choice.
    pub fn try_transition_to_next_state(
        &mut self,
        ctx: &mut dyn Context,
        args: Vec<Value>,
    ) -> Result<Option<TransitionId>, MachineError> {
        match self.transition_to_next_state(ctx, args) {
            Ok(t) => Ok(Some(t)),
            Err(MachineError::UnknownTransition { .. } | MachineError::AmbiguousTransition { .. }) => {
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    /// Queues a transition only when exactly one passes its guard.
    pub fn transition_if_valid(
        &mut self,
        ctx: &mut dyn Context,
        args: Vec<Value>,
    ) -> Result<Option<TransitionId>, MachineError> {
        let valid = self.valid_transitions(ctx, &args)?;
        match valid.as_slice() {
            [t] => {
                let t = *t;
                self.queue_transition(t, args)?;
                Ok(Some(t))
            }
            _ => Ok(None),
        }
    }

    // copies

    /// Independent machine on the same graph with copies of the queues and
    /// history.
    pub fn fork(&self) -> Machine {
        Machine {
            id: Uuid::new_v4(),
            graph: Arc::clone(&self.graph),
            definition: self.definition,
            active: self.active,
            event_queue: self.event_queue.clone(),
            transition_queue: self.transition_queue.clone(),
            phase: Phase::default(),
            running: false,
            paused: false,
            transition: None,
            last_transition: self.last_transition,
            event: None,
            trigger: None,
            history: self.history.detached_copy(),
            options: self.options.clone(),
            observer: Arc::clone(&self.observer),
        }
    }

    /// Machine for the nested definition of the composite `state`.
    ///
    /// With `propagate_history` set, its records are also appended to this
    /// machine's history.
    pub fn spawn_submachine(&self, state: StateId) -> Result<Machine, MachineError> {
        let nested = self
            .graph
            .state(state)?
            .submachine()
            .ok_or_else(|| MachineError::NotComposite {
                state: self.graph.path_of_state(state),
            })?;
        let mut child = Self::bound(Arc::clone(&self.graph), nested, self.options.clone());
        child.observer = Arc::clone(&self.observer);
        if self.options.propagate_history {
            child.history = HistoryLog::forwarding_to(&self.history);
        }
        Ok(child)
    }

    /// Gives this machine a private copy of its definition.
    ///
    /// The definition subtree is deep-copied into a new graph and every
    /// handle the machine holds is translated into the copy.
    pub fn isolate(&mut self) -> Result<(), MachineError> {
        if self.running {
            return Err(MachineError::UnexpectedRecursion {
                operation: "isolate",
            });
        }
        let (graph, map) = self.graph.copy_definition(self.definition)?;

        let active = match self.active {
            Some(s) => Some(map.state(s).ok_or_else(|| GraphError::UnknownState {
                path: self.graph.path_of_state(s),
            })?),
            None => None,
        };
        let pending = match &self.transition_queue {
            Some(p) => Some(PendingTransition {
                transition: map.transition(p.transition).ok_or_else(|| {
                    GraphError::UnknownTransition {
                        path: self.graph.path_of_transition(p.transition),
                    }
                })?,
                args: p.args.clone(),
            }),
            None => None,
        };

        self.history.remap(|mut record| {
            record.new_state = map.state(record.new_state)?;
            record.previous_state = record.previous_state.and_then(|s| map.state(s));
            record.transition = record.transition.and_then(|t| map.transition(t));
            Some(record)
        });
        self.active = active;
        self.transition_queue = pending;
        self.last_transition = self.last_transition.and_then(|t| map.transition(t));
        self.definition = graph.root();
        self.graph = Arc::new(graph);
        Ok(())
    }

    pub(crate) fn restore_parts(
        &mut self,
        active: Option<StateId>,
        pending: Option<PendingTransition>,
        events: VecDeque<Event>,
    ) {
        self.active = active;
        self.transition_queue = pending;
        self.event_queue = events;
    }
}

impl fmt::Debug for Machine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Machine")
            .field("id", &self.id)
            .field("definition", &self.definition)
            .field("active", &self.active_path())
            .field("status", &self.status())
            .field("pending", &self.transition_queue)
            .field("events", &self.event_queue.len())
            .field("history", &self.history.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{GraphBuilder, StateBuilder, TransitionBuilder};
    use crate::engine::{Handlers, RecordingObserver};
    use serde_json::json;

    fn linear() -> Arc<Graph> {
        Arc::new(
            GraphBuilder::new("linear")
                .initial("a")
                .final_state("c")
                .transition(TransitionBuilder::new().from("a").to("b").trigger("next"))
                .unwrap()
                .transition(TransitionBuilder::new().from("b").to("c").trigger("next"))
                .unwrap()
                .build()
                .unwrap(),
        )
    }

    fn state(machine: &Machine, path: &str) -> StateId {
        machine.graph().state_by_path(path).unwrap()
    }

    #[test]
    fn start_enters_start_state_and_seeds_history() {
        let mut machine = Machine::new(linear());
        assert!(!machine.started());

        let a = machine.start(&mut (), &[]).unwrap();
        assert_eq!(machine.active_path().as_deref(), Some("a"));
        assert!(machine.at_start());
        assert!(!machine.at_end());
        assert_eq!(machine.history().len(), 1);
        assert_eq!(machine.history().records()[0].new_state, a);
        assert!(machine.history().records()[0].previous_state.is_none());
    }

    #[test]
    fn start_without_start_state_fails() {
        let graph = Arc::new(Graph::new("empty"));
        let mut machine = Machine::new(graph);
        assert!(matches!(
            machine.start(&mut (), &[]),
            Err(MachineError::NoStartState { .. })
        ));
    }

    #[test]
    fn queue_requires_started_machine() {
        let graph = linear();
        let t = graph.transition_by_path("a->b").unwrap();
        let mut machine = Machine::new(graph);
        assert_eq!(
            machine.queue_transition(t, vec![]),
            Err(MachineError::NotStarted)
        );
    }

    #[test]
    fn queue_holds_one_transition() {
        let graph = linear();
        let t = graph.transition_by_path("a->b").unwrap();
        let mut machine = Machine::new(graph);
        machine.start(&mut (), &[]).unwrap();
        machine.queue_transition(t, vec![]).unwrap();
        assert!(matches!(
            machine.queue_transition(t, vec![]),
            Err(MachineError::TransitionPending { .. })
        ));
    }

    #[test]
    fn queue_rejects_transitions_from_inactive_states() {
        let graph = linear();
        let later = graph.transition_by_path("b->c").unwrap();
        let mut machine = Machine::new(graph);
        machine.start(&mut (), &[]).unwrap();

        assert!(matches!(
            machine.queue_transition(later, vec![]),
            Err(MachineError::CannotTransition { .. })
        ));
        assert!(!machine.has_pending_transitions());
        assert_eq!(machine.active_path().as_deref(), Some("a"));
    }

    #[test]
    fn submachine_ignores_transitions_leaving_its_definition() {
        let graph = Arc::new(
            GraphBuilder::new("outer")
                .initial("a")
                .final_state("d")
                .composite(
                    "b",
                    GraphBuilder::new("b")
                        .initial("x")
                        .final_state("y")
                        .transition(TransitionBuilder::new().from("x").to("y").trigger("finish"))
                        .unwrap()
                        .transition(TransitionBuilder::new().from("x").to("d").trigger("escape"))
                        .unwrap(),
                )
                .transition(TransitionBuilder::new().from("a").to("b"))
                .unwrap()
                .build()
                .unwrap(),
        );
        let parent = Machine::new(Arc::clone(&graph));
        let b = graph.state_by_path("b").unwrap();
        let mut child = parent.spawn_submachine(b).unwrap();
        child.start(&mut (), &[]).unwrap();

        let escape = graph.transition_by_path("b::x->d").unwrap();
        assert!(matches!(
            child.queue_transition(escape, vec![]),
            Err(MachineError::CannotTransition { .. })
        ));
        assert!(matches!(
            child.transition(&mut (), "x->d", vec![]),
            Err(MachineError::UnknownTransition { .. })
        ));

        child.event("escape");
        assert!(matches!(
            child.run_events(&mut ()),
            Err(MachineError::UnhandledEvent { .. })
        ));
        assert_eq!(child.active_path().as_deref(), Some("b::x"));
    }

    #[test]
    fn run_single_fires_one_transition() {
        let mut machine = Machine::new(linear());
        machine.start(&mut (), &[]).unwrap();
        machine.transition(&mut (), "a->b", vec![]).unwrap();

        let outcome = machine.run(&mut (), RunMode::Single).unwrap();
        assert_eq!(
            outcome,
            RunOutcome::Completed {
                fired: 1,
                stop: StopReason::SingleStep
            }
        );
        assert_eq!(machine.active_path().as_deref(), Some("b"));
        assert_eq!(machine.status(), EngineStatus::Idle);
    }

    #[test]
    fn run_with_hook_feeds_the_queue() {
        let mut machine = Machine::new(linear());
        machine.start(&mut (), &[]).unwrap();

        let mut calls = 0;
        let outcome = machine
            .run_with(&mut (), RunMode::Continuous, |m, ctx| {
                calls += 1;
                m.transition_if_valid(ctx, vec![])?;
                Ok(())
            })
            .unwrap();

        assert_eq!(outcome.fired(), 2);
        assert_eq!(outcome.stop(), Some(StopReason::AtEnd));
        assert_eq!(calls, 2);
        assert!(machine.at_end());
    }

    #[test]
    fn at_end_rejects_further_queueing() {
        let mut machine = Machine::new(linear());
        machine.start(&mut (), &[]).unwrap();
        machine.event("next").event("next");
        machine.run_events(&mut ()).unwrap();
        assert!(machine.at_end());

        let t = machine.graph().transition_by_path("a->b").unwrap();
        assert!(matches!(
            machine.queue_transition(t, vec![]),
            Err(MachineError::CannotTransition { .. })
        ));
    }

    #[test]
    fn pause_outside_run_is_rejected() {
        let mut machine = Machine::new(linear());
        assert!(machine.pause().is_err());
        assert!(machine.resume().is_err());
    }

    #[test]
    fn pause_in_do_activity_stops_event_processing() {
        let graph = Arc::new(
            GraphBuilder::new("pausing")
                .initial("a")
                .final_state("c")
                .state(StateBuilder::new("b").do_activity(Behavior::callback(|m, _, _, _| {
                    m.pause()?;
                    Ok(None)
                })))
                .transition(TransitionBuilder::new().from("a").to("b").trigger("go"))
                .unwrap()
                .transition(TransitionBuilder::new().from("b").to("c").trigger("go"))
                .unwrap()
                .build()
                .unwrap(),
        );
        let mut machine = Machine::new(graph);
        machine.start(&mut (), &[]).unwrap();
        machine.event("go").event("go");

        let outcome = machine.run_events(&mut ()).unwrap();
        assert_eq!(outcome.stop(), Some(StopReason::Paused));
        assert_eq!(machine.active_path().as_deref(), Some("b"));
        assert_eq!(machine.event_queue().len(), 1);
        assert!(!machine.is_paused());

        machine.run_events(&mut ()).unwrap();
        assert!(machine.at_end());
    }

    #[test]
    fn nested_run_reports_already_running() {
        let graph = Arc::new(
            GraphBuilder::new("nested")
                .initial("a")
                .final_state("b")
                .state(StateBuilder::new("b").do_activity(Behavior::callback(|m, ctx, _, _| {
                    let outcome = m.run(ctx, RunMode::Continuous)?;
                    Ok(Some(outcome == RunOutcome::AlreadyRunning))
                })))
                .transition(TransitionBuilder::new().from("a").to("b"))
                .unwrap()
                .build()
                .unwrap(),
        );
        let mut machine = Machine::new(graph);
        machine.start(&mut (), &[]).unwrap();
        machine.transition(&mut (), "a->b", vec![]).unwrap();
        assert_eq!(machine.run(&mut (), RunMode::Continuous).unwrap().fired(), 1);
    }

    #[test]
    fn nested_run_resumes_a_paused_run() {
        let graph = Arc::new(
            GraphBuilder::new("resuming")
                .initial("a")
                .final_state("c")
                .state(StateBuilder::new("b").do_activity(Behavior::callback(|m, ctx, _, _| {
                    m.pause()?;
                    m.transition(ctx, "b->c", vec![])?;
                    assert_eq!(m.run(ctx, RunMode::Continuous)?, RunOutcome::AlreadyRunning);
                    Ok(None)
                })))
                .transition(TransitionBuilder::new().from("a").to("b"))
                .unwrap()
                .transition(TransitionBuilder::new().from("b").to("c"))
                .unwrap()
                .build()
                .unwrap(),
        );
        let mut machine = Machine::new(graph);
        machine.start(&mut (), &[]).unwrap();
        machine.transition(&mut (), "a->b", vec![]).unwrap();

        let outcome = machine.run(&mut (), RunMode::Continuous).unwrap();
        assert_eq!(outcome.fired(), 2);
        assert_eq!(outcome.stop(), Some(StopReason::AtEnd));
        assert!(machine.at_end());
    }

    #[test]
    fn queueing_from_entry_is_recursion() {
        let graph = Arc::new(
            GraphBuilder::new("recursive")
                .initial("a")
                .final_state("c")
                .state(StateBuilder::new("b").entry(Behavior::callback(|m, ctx, _, _| {
                    m.transition(ctx, "b->c", vec![])?;
                    Ok(None)
                })))
                .transition(TransitionBuilder::new().from("a").to("b"))
                .unwrap()
                .transition(TransitionBuilder::new().from("b").to("c"))
                .unwrap()
                .build()
                .unwrap(),
        );
        let mut machine = Machine::new(graph);
        let a = machine.start(&mut (), &[]).unwrap();
        machine.transition(&mut (), "a->b", vec![]).unwrap();

        let err = machine.run(&mut (), RunMode::Continuous).unwrap_err();
        assert!(matches!(err, MachineError::UnexpectedRecursion { .. }));
        assert_eq!(machine.active_state(), Some(a));
        assert!(!machine.in_entry());
        assert!(!machine.is_running());
        assert_eq!(machine.history().len(), 1);
    }

    #[test]
    fn queueing_from_do_activity_is_picked_up() {
        let graph = Arc::new(
            GraphBuilder::new("chain")
                .initial("a")
                .final_state("c")
                .state(StateBuilder::new("b").do_activity(Behavior::callback(|m, ctx, _, _| {
                    m.transition_to_next_state(ctx, vec![])?;
                    Ok(None)
                })))
                .transition(TransitionBuilder::new().from("a").to("b"))
                .unwrap()
                .transition(TransitionBuilder::new().from("b").to("c"))
                .unwrap()
                .build()
                .unwrap(),
        );
        let mut machine = Machine::new(graph);
        machine.start(&mut (), &[]).unwrap();
        machine.transition(&mut (), "a->b", vec![]).unwrap();

        let outcome = machine.run(&mut (), RunMode::Continuous).unwrap();
        assert_eq!(outcome.fired(), 2);
        assert!(machine.at_end());
        assert_eq!(machine.history().len(), 3);
    }

    #[test]
    fn named_behaviors_reach_the_context() {
        let graph = Arc::new(
            GraphBuilder::new("named")
                .initial("a")
                .final_state("b")
                .state(StateBuilder::new("b").entry("arrive"))
                .transition(TransitionBuilder::new().from("a").to("b").effect("travel"))
                .unwrap()
                .build()
                .unwrap(),
        );
        let mut ctx = Handlers::new(Vec::<String>::new())
            .on("arrive", |cx, _, element, _| {
                cx.state.push(format!("arrive {}", element.name()));
                Ok(None)
            })
            .on("travel", |cx, m, element, args| {
                assert!(m.in_effect());
                cx.state.push(format!("travel {} {}", element.name(), args.len()));
                Ok(None)
            });

        let mut machine = Machine::new(graph);
        machine.start(&mut ctx, &[]).unwrap();
        machine.transition(&mut ctx, "a->b", vec![json!(1)]).unwrap();
        machine.run(&mut ctx, RunMode::Continuous).unwrap();

        assert_eq!(ctx.state, vec!["travel a->b 1", "arrive b"]);
    }

    #[test]
    fn definition_options_fill_empty_slots() {
        let graph = Arc::new(
            GraphBuilder::new("defaults")
                .initial("a")
                .final_state("b")
                .option(Action::Guard, Behavior::callback(|_, _, _, _| Ok(Some(false))))
                .transition(TransitionBuilder::new().from("a").to("b"))
                .unwrap()
                .build()
                .unwrap(),
        );
        let mut machine = Machine::new(graph);
        machine.start(&mut (), &[]).unwrap();
        assert!(matches!(
            machine.transition(&mut (), "a->b", vec![]),
            Err(MachineError::CannotTransition { .. })
        ));
    }

    #[test]
    fn literal_action_name_is_the_last_fallback() {
        let graph = Arc::new(
            GraphBuilder::new("fallback")
                .initial("a")
                .final_state("b")
                .transition(TransitionBuilder::new().from("a").to("b"))
                .unwrap()
                .build()
                .unwrap(),
        );
        let mut ctx = Handlers::new(0).on("guard", |_, _, _, _| Ok(Some(false)));
        let mut machine = Machine::new(graph);
        machine.start(&mut ctx, &[]).unwrap();
        assert!(machine.valid_transitions(&mut ctx, &[]).unwrap().is_empty());
    }

    #[test]
    fn observer_sees_cascade_in_order() {
        let observer = Arc::new(RecordingObserver::new());
        let mut machine = Machine::new(linear()).with_observer(observer.clone());
        let a = machine.start(&mut (), &[]).unwrap();
        let b = state(&machine, "b");
        let t = machine.transition(&mut (), "a->b", vec![]).unwrap();
        observer.clear();
        machine.run(&mut (), RunMode::Single).unwrap();

        assert_eq!(
            observer.notices(),
            vec![
                Notice::EffectInvoked { transition: t },
                Notice::StateExited { state: a },
                Notice::StateEntered { state: b },
                Notice::ActivityInvoked { state: b },
                Notice::TransitionFired {
                    transition: t,
                    from: Some(a),
                    to: b
                },
            ]
        );
    }

    #[test]
    fn history_can_be_disabled() {
        let mut machine =
            Machine::with_options(linear(), MachineOptions::default().without_history());
        machine.start(&mut (), &[]).unwrap();
        machine.event("next");
        machine.run_events(&mut ()).unwrap();
        assert!(machine.history().is_empty());
    }

    #[test]
    fn history_data_is_attached() {
        let options = MachineOptions::default().with_history_data(json!({"run": 7}));
        let mut machine = Machine::with_options(linear(), options);
        machine.start(&mut (), &[]).unwrap();
        machine.event("next");
        machine.run_events(&mut ()).unwrap();

        let last = machine.history().last().unwrap();
        assert_eq!(last.data, Some(json!({"run": 7})));
        assert_eq!(last.trigger.as_deref(), Some("next"));
        assert_eq!(last.event.unwrap().name, "next");
    }

    #[test]
    fn fork_is_independent() {
        let mut machine = Machine::new(linear());
        machine.start(&mut (), &[]).unwrap();
        let mut fork = machine.fork();
        assert_ne!(fork.id(), machine.id());

        fork.event("next");
        fork.run_events(&mut ()).unwrap();
        assert_eq!(fork.active_path().as_deref(), Some("b"));
        assert_eq!(machine.active_path().as_deref(), Some("a"));
        assert_eq!(machine.history().len(), 1);
        assert_eq!(fork.history().len(), 2);
    }

    #[test]
    fn goto_state_reseeds_history() {
        let mut machine = Machine::new(linear());
        machine.start(&mut (), &[]).unwrap();
        machine.event("next");
        machine.run_events(&mut ()).unwrap();

        let c = state(&machine, "c");
        machine.goto_state(&mut (), c, &[]).unwrap();
        assert!(machine.at_end());
        assert_eq!(machine.history().len(), 1);
    }

    #[test]
    fn isolate_remaps_handles_into_private_graph() {
        let shared = linear();
        let mut machine = Machine::new(Arc::clone(&shared));
        machine.start(&mut (), &[]).unwrap();
        machine.transition(&mut (), "a->b", vec![json!("x")]).unwrap();

        machine.isolate().unwrap();
        assert!(!Arc::ptr_eq(machine.graph(), &shared));
        assert_eq!(machine.active_path().as_deref(), Some("a"));
        let pending = machine.pending_transition().unwrap();
        assert_eq!(machine.graph().path_of_transition(pending.transition), "a->b");
        assert_eq!(pending.args, vec![json!("x")]);

        let b = state(&machine, "b");
        machine
            .graph_mut()
            .set_state_behavior(
                b,
                Action::Entry,
                Behavior::callback(|_, _, _, _| Err(MachineError::behavior("entry", "boom"))),
            )
            .unwrap();
        assert!(machine.run(&mut (), RunMode::Single).is_err());

        // the shared definition never saw the failing behavior
        let mut other = Machine::new(shared);
        other.start(&mut (), &[]).unwrap();
        other.transition(&mut (), "a->b", vec![]).unwrap();
        assert!(other.run(&mut (), RunMode::Single).is_ok());
    }
}
