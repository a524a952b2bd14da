//! Verification pass over every registered resource.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Instant;

use tokio::sync::Mutex;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{error, info, warn};

use ytclip_events::{EventBus, ResourceEmitter};
use ytclip_models::Event;

use crate::error::{ResourceError, ResourceResult};
use crate::metrics;
use crate::progress::{steps, ProgressReporter};
use crate::readiness::{ReadinessFlag, ReadinessHandle};
use crate::resource::{Resource, ResourceState};
use crate::verifier::ResourceVerifier;

type States = Arc<RwLock<HashMap<String, ResourceState>>>;

/// Owns the resource catalog, their states and the readiness flag.
///
/// A pass verifies all resources concurrently and stops at the first
/// failure. Passes are serialized; once a pass succeeds, later calls only
/// re-announce completion.
pub struct ResourceManager {
    resources: Vec<Resource>,
    verifier: Arc<dyn ResourceVerifier>,
    bus: EventBus,
    readiness: ReadinessFlag,
    states: States,
    work_dirs: Vec<PathBuf>,
    pass: Mutex<()>,
}

impl ResourceManager {
    pub fn new(resources: Vec<Resource>, verifier: Arc<dyn ResourceVerifier>, bus: EventBus) -> Self {
        let states = resources
            .iter()
            .map(|r| (r.name.clone(), ResourceState::Unchecked))
            .collect();
        Self {
            resources,
            verifier,
            bus,
            readiness: ReadinessFlag::new(),
            states: Arc::new(RwLock::new(states)),
            work_dirs: Vec::new(),
            pass: Mutex::new(()),
        }
    }

    /// Directories created before each pass.
    pub fn with_work_dirs(mut self, dirs: impl IntoIterator<Item = PathBuf>) -> Self {
        self.work_dirs.extend(dirs);
        self
    }

    pub fn readiness(&self) -> ReadinessHandle {
        self.readiness.handle()
    }

    pub fn is_ready(&self) -> bool {
        self.readiness.is_set()
    }

    pub fn resources(&self) -> &[Resource] {
        &self.resources
    }

    pub fn state(&self, name: &str) -> Option<ResourceState> {
        read_states(&self.states).get(name).cloned()
    }

    /// States in registration order.
    pub fn states(&self) -> Vec<(String, ResourceState)> {
        let states = read_states(&self.states);
        self.resources
            .iter()
            .map(|r| {
                let state = states.get(&r.name).cloned().unwrap_or_default();
                (r.name.clone(), state)
            })
            .collect()
    }

    /// Start a pass in the background and return immediately.
    pub fn setup(self: &Arc<Self>) -> JoinHandle<ResourceResult<()>> {
        let manager = Arc::clone(self);
        tokio::spawn(async move { manager.run_setup().await })
    }

    /// Run a pass to completion.
    pub async fn run_setup(&self) -> ResourceResult<()> {
        let _pass = self.pass.lock().await;

        if self.readiness.is_set() {
            info!("Resources already verified");
            self.bus.publish(Event::ResourceFinish);
            return Ok(());
        }

        let started = Instant::now();
        self.bus.publish(Event::ResourceStart);

        if let Err(e) = self.prepare_work_dirs().await {
            error!("Failed to prepare working directories: {}", e);
            self.bus.publish(Event::resource_error(None, e.to_string()));
            metrics::record_setup_pass("failed", started.elapsed().as_secs_f64());
            return Err(e);
        }

        for state in write_states(&self.states).values_mut() {
            *state = ResourceState::Unchecked;
        }

        match self.verify_all().await {
            Ok(()) => {
                self.readiness.set();
                info!(
                    resources = self.resources.len(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "All resources verified"
                );
                self.bus.publish(Event::ResourceFinish);
                metrics::record_setup_pass("ok", started.elapsed().as_secs_f64());
                Ok(())
            }
            Err((key, e)) => {
                error!(resource = ?key, "Resource setup failed: {}", e);
                self.bus.publish(Event::resource_error(key, e.to_string()));
                metrics::record_setup_pass("failed", started.elapsed().as_secs_f64());
                Err(e)
            }
        }
    }

    async fn prepare_work_dirs(&self) -> ResourceResult<()> {
        for dir in &self.work_dirs {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|e| ResourceError::io_at(dir, e))?;
        }
        Ok(())
    }

    /// Verify concurrently; on the first failure abort the rest.
    async fn verify_all(&self) -> Result<(), (Option<String>, ResourceError)> {
        let mut tasks = JoinSet::new();

        for resource in self.resources.iter().cloned() {
            let verifier = Arc::clone(&self.verifier);
            let states = Arc::clone(&self.states);
            let emitter = ResourceEmitter::new(self.bus.clone(), &resource.name, &resource.title);

            tasks.spawn(async move {
                let reporter = {
                    let emitter = emitter.clone();
                    let states = Arc::clone(&states);
                    let name = resource.name.clone();
                    ProgressReporter::new(move |description, pct| {
                        if let Some(state) = state_for_step(description) {
                            set_state(&states, &name, state);
                        }
                        emitter.progress(description, pct);
                    })
                };

                let result = verifier.ensure(&resource, &reporter).await;
                if result.is_ok() {
                    set_state(&states, &resource.name, ResourceState::Verified);
                    emitter.stop();
                }
                (resource.name, result)
            });
        }

        let mut failure = None;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((name, Ok(()))) => info!(resource = %name, "Resource verified"),
                Ok((name, Err(e))) => {
                    failure = Some((Some(name), e));
                    break;
                }
                Err(join_err) if join_err.is_panic() => {
                    failure = Some((
                        None,
                        ResourceError::Io(std::io::Error::other("resource verification panicked")),
                    ));
                    break;
                }
                Err(_) => {}
            }
        }

        let Some((key, e)) = failure else {
            return Ok(());
        };

        tasks.abort_all();
        while tasks.join_next().await.is_some() {}

        let mut states = write_states(&self.states);
        for (name, state) in states.iter_mut() {
            if key.as_deref() == Some(name.as_str()) {
                *state = ResourceState::Failed(e.to_string());
                metrics::record_resource_failure(name);
            } else if !state.is_verified() {
                if matches!(state, ResourceState::Installing) {
                    warn!(resource = %name, "Installation aborted");
                }
                *state = ResourceState::Unchecked;
            }
        }
        Err((key, e))
    }
}

fn state_for_step(description: &str) -> Option<ResourceState> {
    match description {
        steps::NOT_FOUND | steps::OUTDATED => Some(ResourceState::Missing),
        steps::DOWNLOADING | steps::EXTRACTING | steps::VERIFYING => Some(ResourceState::Installing),
        _ => None,
    }
}

fn read_states(
    states: &States,
) -> std::sync::RwLockReadGuard<'_, HashMap<String, ResourceState>> {
    states.read().unwrap_or_else(PoisonError::into_inner)
}

fn write_states(
    states: &States,
) -> std::sync::RwLockWriteGuard<'_, HashMap<String, ResourceState>> {
    states.write().unwrap_or_else(PoisonError::into_inner)
}

fn set_state(states: &States, name: &str, state: ResourceState) {
    write_states(states).insert(name.to_string(), state);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_for_step() {
        assert_eq!(state_for_step(steps::CHECKING), None);
        assert_eq!(state_for_step(steps::NOT_FOUND), Some(ResourceState::Missing));
        assert_eq!(
            state_for_step(steps::DOWNLOADING),
            Some(ResourceState::Installing)
        );
    }
}
