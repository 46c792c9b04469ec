//! Interaction-mode registry.
//!
//! A shared UI region shows one mode at a time. The [`ModeRegistry`] keeps the
//! ordered mode descriptors, tracks which one is active, and creates each
//! mode's state lazily on first activation.
//!
//! # Example
//!
//! ```ignore
//! use desk_modes::{ModeDescriptor, ModeRegistry};
//!
//! let registry = ModeRegistry::new();
//! registry.register(ModeDescriptor::new("curation").with_state::<CurationState>());
//! registry.register(ModeDescriptor::new("zap").with_state::<ZapState>());
//!
//! let curation = registry.activate("curation")?;
//! curation.state().update(|s: &mut CurationState| s.select("note1abc"));
//! registry.activate("zap")?;
//! // State survives the switch.
//! let again = registry.activate("curation")?;
//! assert!(again.state().same_instance(curation.state()));
//! ```

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use thiserror::Error;
use tokio::sync::watch;

use crate::state::StateContainer;

/// Mode registry error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModeError {
    /// No descriptor is registered under this name.
    #[error("Unknown mode: {name}")]
    UnknownMode { name: String },
}

impl ModeError {
    /// Get a user-friendly message for this error.
    pub fn user_message(&self) -> String {
        match self {
            Self::UnknownMode { name } => format!("There is no '{}' panel.", name),
        }
    }

    /// Get a suggestion for how to resolve this error.
    pub fn suggestion(&self) -> Option<String> {
        match self {
            Self::UnknownMode { .. } => {
                Some("Run `draftdesk modes` to list the available panels.".into())
            }
        }
    }
}

/// Opaque reference to a presentation unit (a trigger button, toolbar or
/// content view).
///
/// The registry never looks inside; renderers resolve the id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Affordance(String);

impl Affordance {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn id(&self) -> &str {
        &self.0
    }
}

/// Zero-argument constructor of a fresh state container.
pub type StateFactory = Arc<dyn Fn() -> StateContainer + Send + Sync>;

/// Description of one interaction mode.
#[derive(Clone)]
pub struct ModeDescriptor {
    name: String,
    label: Option<String>,
    trigger: Option<Affordance>,
    toolbar: Option<Affordance>,
    view: Option<Affordance>,
    state_factory: Option<StateFactory>,
}

impl ModeDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            label: None,
            trigger: None,
            toolbar: None,
            view: None,
            state_factory: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_trigger(mut self, trigger: Affordance) -> Self {
        self.trigger = Some(trigger);
        self
    }

    pub fn with_toolbar(mut self, toolbar: Affordance) -> Self {
        self.toolbar = Some(toolbar);
        self
    }

    pub fn with_view(mut self, view: Affordance) -> Self {
        self.view = Some(view);
        self
    }

    /// Use `factory` to build the mode's state on first activation.
    pub fn with_factory<F>(mut self, factory: F) -> Self
    where
        F: Fn() -> StateContainer + Send + Sync + 'static,
    {
        self.state_factory = Some(Arc::new(factory));
        self
    }

    /// Start the mode with `T::default()`.
    pub fn with_state<T>(self) -> Self
    where
        T: Any + Default + Send + Sync,
    {
        self.with_factory(|| StateContainer::new(T::default()))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Display label, falling back to the name.
    pub fn label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.name)
    }

    pub fn trigger(&self) -> Option<&Affordance> {
        self.trigger.as_ref()
    }

    pub fn toolbar(&self) -> Option<&Affordance> {
        self.toolbar.as_ref()
    }

    pub fn view(&self) -> Option<&Affordance> {
        self.view.as_ref()
    }

    pub fn has_state(&self) -> bool {
        self.state_factory.is_some()
    }
}

impl fmt::Debug for ModeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModeDescriptor")
            .field("name", &self.name)
            .field("label", &self.label)
            .field("trigger", &self.trigger)
            .field("toolbar", &self.toolbar)
            .field("view", &self.view)
            .field("has_state", &self.has_state())
            .finish()
    }
}

/// An activated mode: its descriptor plus its state.
#[derive(Debug, Clone)]
pub struct ActiveMode {
    descriptor: Arc<ModeDescriptor>,
    state: StateContainer,
}

impl ActiveMode {
    pub fn name(&self) -> &str {
        self.descriptor.name()
    }

    pub fn descriptor(&self) -> &ModeDescriptor {
        &self.descriptor
    }

    pub fn state(&self) -> &StateContainer {
        &self.state
    }

    pub fn trigger(&self) -> Option<&Affordance> {
        self.descriptor.trigger()
    }

    pub fn toolbar(&self) -> Option<&Affordance> {
        self.descriptor.toolbar()
    }

    pub fn view(&self) -> Option<&Affordance> {
        self.descriptor.view()
    }
}

#[derive(Default)]
struct Inner {
    /// Insertion order is display order.
    descriptors: Vec<Arc<ModeDescriptor>>,
    active: Option<String>,
    instances: HashMap<String, StateContainer>,
}

impl Inner {
    fn find(&self, name: &str) -> Option<&Arc<ModeDescriptor>> {
        self.descriptors.iter().find(|d| d.name() == name)
    }
}

/// Ordered collection of modes with one active mode at a time.
///
/// All methods take `&self`; the registry can be shared behind an `Arc`.
/// Readers never observe a half-applied activation or registration.
pub struct ModeRegistry {
    inner: RwLock<Inner>,
    active_tx: watch::Sender<Option<String>>,
    /// Handed to every mode without a state factory.
    noop_state: StateContainer,
}

impl Default for ModeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ModeRegistry {
    /// Create an empty registry with no active mode.
    pub fn new() -> Self {
        let (active_tx, _) = watch::channel(None);
        Self {
            inner: RwLock::new(Inner::default()),
            active_tx,
            noop_state: StateContainer::noop(),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a mode.
    ///
    /// If a mode with this name is already registered, it is replaced in
    /// place (keeping its display position) and its cached state is dropped.
    /// Returns `true` if a descriptor was replaced.
    pub fn register(&self, descriptor: ModeDescriptor) -> bool {
        let descriptor = Arc::new(descriptor);
        let mut inner = self.write();
        let name = descriptor.name().to_string();
        let replaced = match inner.descriptors.iter_mut().find(|d| d.name() == name) {
            Some(slot) => {
                *slot = descriptor;
                true
            }
            None => {
                inner.descriptors.push(descriptor);
                false
            }
        };
        if replaced && inner.instances.remove(&name).is_some() {
            tracing::debug!(mode = %name, "Dropped state of replaced mode");
        }
        tracing::debug!(mode = %name, replaced, "Registered mode");
        replaced
    }

    /// Make `name` the active mode.
    ///
    /// The first activation runs the mode's state factory; later activations
    /// return the cached state with all mutations preserved. On
    /// [`ModeError::UnknownMode`] the active mode is left unchanged.
    pub fn activate(&self, name: &str) -> Result<ActiveMode, ModeError> {
        let mut inner = self.write();
        let descriptor = inner
            .find(name)
            .cloned()
            .ok_or_else(|| ModeError::UnknownMode {
                name: name.to_string(),
            })?;

        let state = match &descriptor.state_factory {
            Some(factory) => match inner.instances.get(name) {
                Some(state) => state.clone(),
                None => {
                    tracing::debug!(mode = name, "Instantiating mode state");
                    let state = factory();
                    inner.instances.insert(name.to_string(), state.clone());
                    state
                }
            },
            None => self.noop_state.clone(),
        };

        if inner.active.as_deref() != Some(name) {
            inner.active = Some(name.to_string());
            self.active_tx.send_replace(Some(name.to_string()));
            tracing::info!(mode = name, "Activated mode");
        }
        Ok(ActiveMode { descriptor, state })
    }

    /// Leave the active mode without activating another one.
    ///
    /// State is kept. Returns the previously active name.
    pub fn deactivate(&self) -> Option<String> {
        let mut inner = self.write();
        let previous = inner.active.take();
        if previous.is_some() {
            self.active_tx.send_replace(None);
            tracing::info!("Deactivated mode");
        }
        previous
    }

    /// Name of the active mode.
    pub fn current(&self) -> Option<String> {
        self.read().active.clone()
    }

    /// State of the active mode, if it has been instantiated.
    pub fn active_state(&self) -> Option<StateContainer> {
        let inner = self.read();
        let name = inner.active.as_deref()?;
        inner.instances.get(name).cloned()
    }

    /// Drop a mode's cached state so its factory runs on next activation.
    ///
    /// Returns `true` if there was state to drop. The active mode stays
    /// active.
    pub fn reset(&self, name: &str) -> Result<bool, ModeError> {
        let mut inner = self.write();
        if inner.find(name).is_none() {
            return Err(ModeError::UnknownMode {
                name: name.to_string(),
            });
        }
        let dropped = inner.instances.remove(name).is_some();
        tracing::debug!(mode = name, dropped, "Reset mode state");
        Ok(dropped)
    }

    /// True once the mode's state has been created (and not reset since).
    pub fn is_instantiated(&self, name: &str) -> bool {
        self.read().instances.contains_key(name)
    }

    /// Descriptors in display order.
    pub fn descriptors(&self) -> Vec<Arc<ModeDescriptor>> {
        self.read().descriptors.clone()
    }

    pub fn get(&self, name: &str) -> Option<Arc<ModeDescriptor>> {
        self.read().find(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.read().find(name).is_some()
    }

    /// Receiver notified whenever the active mode changes.
    pub fn subscribe(&self) -> watch::Receiver<Option<String>> {
        self.active_tx.subscribe()
    }

    pub fn len(&self) -> usize {
        self.read().descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().descriptors.is_empty()
    }
}

impl fmt::Debug for ModeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.read();
        let names: Vec<&str> = inner.descriptors.iter().map(|d| d.name()).collect();
        f.debug_struct("ModeRegistry")
            .field("modes", &names)
            .field("active", &inner.active)
            .finish()
    }
}
