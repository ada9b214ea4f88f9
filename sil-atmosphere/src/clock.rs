//! Relógios para o loop de amostragem
//!
//! Tempos são `Duration` desde a época Unix, para que os prazos absolutos e
//! o timestamp dos registros venham da mesma fonte.

use std::cell::Cell;
use std::future::Future;
use std::rc::Rc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

pub trait Clock {
    /// Tempo de parede atual
    fn now(&self) -> Duration;

    /// Dorme até o prazo absoluto (retorna imediatamente se já passou)
    fn sleep_until(&mut self, deadline: Duration) -> impl Future<Output = ()>;

    /// Dorme por um intervalo relativo
    fn sleep(&mut self, duration: Duration) -> impl Future<Output = ()> {
        let deadline = self.now() + duration;
        self.sleep_until(deadline)
    }
}

/// Relógio do sistema com sono via tokio
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
    }

    async fn sleep_until(&mut self, deadline: Duration) {
        // Recalcula contra o relógio de parede a cada tick: sem deriva acumulada
        let remaining = deadline.saturating_sub(self.now());
        if !remaining.is_zero() {
            tokio::time::sleep(remaining).await;
        }
    }
}

/// Relógio manual para testes: só avança quando alguém dorme ou chama `advance`.
///
/// Clones compartilham o mesmo tempo, permitindo que um sensor de teste
/// simule latência de processamento.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Rc<Cell<Duration>>,
    sleeps: Rc<Cell<u64>>,
}

impl ManualClock {
    pub fn new(start: Duration) -> Self {
        Self {
            now: Rc::new(Cell::new(start)),
            sleeps: Rc::new(Cell::new(0)),
        }
    }

    pub fn starting_at_secs(secs: u64) -> Self {
        Self::new(Duration::from_secs(secs))
    }

    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }

    pub fn set(&self, to: Duration) {
        self.now.set(to);
    }

    /// Chamadas de sono que efetivamente avançaram o tempo
    pub fn sleep_count(&self) -> u64 {
        self.sleeps.get()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        self.now.get()
    }

    async fn sleep_until(&mut self, deadline: Duration) {
        if deadline > self.now.get() {
            self.now.set(deadline);
            self.sleeps.set(self.sleeps.get() + 1);
        }
        tokio::task::yield_now().await;
    }
}

/// Arredonda para cima até o próximo segundo inteiro
pub fn next_whole_second(t: Duration) -> Duration {
    if t.subsec_nanos() == 0 {
        t
    } else {
        Duration::from_secs(t.as_secs() + 1)
    }
}
