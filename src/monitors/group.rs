use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use crate::{ResourceKind, error::MonitorError, sampler::Sampler};

use super::resource::ResourceMonitor;

/// Runs monitors concurrently and stops all of them once one fails.
pub struct MonitorGroup {
    tasks: JoinSet<(ResourceKind, Result<(), MonitorError>)>,
    cancel: CancellationToken,
}

impl MonitorGroup {
    pub fn new(cancel: CancellationToken) -> Self {
        Self {
            tasks: JoinSet::new(),
            cancel,
        }
    }

    /// Token shared by every monitor in the group.
    pub fn cancellation(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn spawn<S>(&mut self, monitor: ResourceMonitor<S>)
    where
        S: Sampler + 'static,
    {
        let kind = monitor.kind();
        let cancel = self.cancel.clone();
        debug!("spawning {kind} monitor");
        self.tasks
            .spawn(async move { (kind, monitor.run(cancel).await) });
    }

    /// Wait for every monitor to finish.
    ///
    /// The first fatal error cancels the remaining monitors and is returned
    /// once all of them have stopped.
    pub async fn join(mut self) -> Result<(), MonitorError> {
        let mut first_error = None;

        while let Some(joined) = self.tasks.join_next().await {
            let failure = match joined {
                Ok((kind, Ok(()))) => {
                    debug!("{kind} monitor finished");
                    continue;
                }
                Ok((_, Err(e))) => e,
                Err(e) => MonitorError::TaskFailed(e.to_string()),
            };

            error!("{failure}");
            if first_error.is_none() {
                self.cancel.cancel();
                first_error = Some(failure);
            }
        }

        first_error.map_or(Ok(()), Err)
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use assert_matches::assert_matches;
    use async_trait::async_trait;

    use super::*;
    use crate::{
        ResourceReading,
        alerts::{AlertEvent, Dispatcher},
        config::{AlertChannelConfig, ThresholdConfig},
        error::{DispatchError, SamplingError},
    };

    struct Steady(ResourceKind);

    impl Sampler for Steady {
        fn kind(&self) -> ResourceKind {
            self.0
        }

        fn sample(&mut self) -> Result<ResourceReading, SamplingError> {
            Ok(ResourceReading::new(self.0, 10.0))
        }
    }

    struct Broken;

    impl Sampler for Broken {
        fn kind(&self) -> ResourceKind {
            ResourceKind::Disk
        }

        fn sample(&mut self) -> Result<ResourceReading, SamplingError> {
            Err(SamplingError::MountNotFound("/missing".into()))
        }
    }

    struct Silent;

    #[async_trait]
    impl Dispatcher for Silent {
        async fn dispatch(
            &self,
            _event: &AlertEvent,
            _channel: &AlertChannelConfig,
        ) -> Result<(), DispatchError> {
            Ok(())
        }
    }

    fn monitor<S: Sampler>(sampler: S) -> ResourceMonitor<S> {
        ResourceMonitor::new(
            sampler,
            ThresholdConfig::new(80.0, Duration::from_secs(30), Duration::from_secs(1)).unwrap(),
            Arc::new(AlertChannelConfig::default()),
            Arc::new(Silent),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_failure_cancels_siblings() {
        let mut group = MonitorGroup::new(CancellationToken::new());
        let cancel = group.cancellation();
        group.spawn(monitor(Steady(ResourceKind::Cpu)));
        group.spawn(monitor(Steady(ResourceKind::Memory)));
        group.spawn(monitor(Broken));
        assert_eq!(group.len(), 3);

        let result = group.join().await;

        assert_matches!(
            result,
            Err(MonitorError::Sampling {
                kind: ResourceKind::Disk,
                source: SamplingError::MountNotFound(_)
            })
        );
        assert!(cancel.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_external_cancellation_stops_all() {
        let cancel = CancellationToken::new();
        let mut group = MonitorGroup::new(cancel.clone());
        for kind in ResourceKind::ALL {
            group.spawn(monitor(Steady(kind)));
        }

        let stopper = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(5)).await;
            cancel.cancel();
        });

        assert!(group.join().await.is_ok());
        stopper.await.unwrap();
    }

    #[tokio::test]
    async fn test_empty_group() {
        let group = MonitorGroup::new(CancellationToken::new());
        assert!(group.is_empty());
        assert!(group.join().await.is_ok());
    }
}
