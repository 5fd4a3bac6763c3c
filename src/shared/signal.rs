use tokio::sync::watch;

/// One-way latch built on a watch channel. Firing is idempotent and every
/// listener, including ones created afterwards, observes it.
pub fn signal() -> (Trigger, Listener) {
    let (tx, rx) = watch::channel(false);
    (Trigger(tx), Listener(rx))
}

#[derive(Debug)]
pub struct Trigger(watch::Sender<bool>);

impl Trigger {
    pub fn fire(&self) {
        self.0.send_replace(true);
    }

    #[cfg(test)]
    pub fn is_fired(&self) -> bool {
        *self.0.borrow()
    }

    pub fn listen(&self) -> Listener {
        Listener(self.0.subscribe())
    }
}

#[derive(Debug, Clone)]
pub struct Listener(watch::Receiver<bool>);

impl Listener {
    pub fn is_fired(&self) -> bool {
        *self.0.borrow()
    }

    /// Resolves once the trigger fires or is dropped.
    pub async fn fired(&mut self) {
        loop {
            if *self.0.borrow_and_update() {
                return;
            }
            if self.0.changed().await.is_err() {
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn late_listeners_see_an_earlier_fire() {
        let (trigger, mut early) = signal();
        trigger.fire();
        trigger.fire();
        let mut late = trigger.listen();
        early.fired().await;
        late.fired().await;
        assert!(late.is_fired());
        assert!(trigger.is_fired());
    }

    #[tokio::test]
    async fn dropping_the_trigger_releases_listeners() {
        let (trigger, mut listener) = signal();
        drop(trigger);
        listener.fired().await;
        assert!(!listener.is_fired());
    }
}
