use async_trait::async_trait;
use rand::Rng;
use std::ops::RangeInclusive;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    #[error("simulated network failure")]
    Network,

    #[error("response backend failed: {0}")]
    Backend(String),
}

/// Maps a prompt to a reply. The keyword table is one implementation; a real
/// backend can satisfy the same contract.
#[async_trait]
pub trait ResponseResolver: Send + Sync {
    async fn resolve(&self, prompt: &str) -> Result<String, ResolveError>;
}

const DEFAULT_RESPONSE: &str = "That's a great physics question! I can help with **mechanics**, \
**quantum physics**, **relativity**, **thermodynamics**, **electromagnetism** and **waves**.\n\
Could you tell me a bit more about what you'd like to explore? For example, you could ask me to \
explain a concept, walk through a derivation, or work through a practice problem step by step.";

const RESPONSES: &[(&str, &str)] = &[
    (
        "newton",
        "**Newton's Laws of Motion** form the foundation of classical mechanics:\n\
1. *First law (inertia)*: an object stays at rest or in uniform motion unless a net force acts on it.\n\
2. *Second law*: the net force equals mass times acceleration, $F = ma$.\n\
3. *Third law*: every action has an equal and opposite reaction.\n\
Would you like to work through an example problem?",
    ),
    (
        "quantum",
        "**Quantum mechanics** describes nature at the scale of atoms and subatomic particles.\n\
Key ideas include *wave-particle duality*, *quantization* of energy ($E = hf$), and the \
*uncertainty principle* ($\\Delta x \\Delta p \\geq \\hbar/2$).\n\
The state of a system is described by a wavefunction that evolves according to the \
Schrödinger equation. Which of these would you like to dig into?",
    ),
    (
        "relativity",
        "Einstein's **theory of relativity** comes in two parts:\n\
- *Special relativity*: the laws of physics are the same in all inertial frames and the speed \
of light is constant. Consequences include time dilation and $E = mc^2$.\n\
- *General relativity*: gravity is the curvature of spacetime caused by mass and energy.\n\
Shall we look at time dilation with a worked example?",
    ),
    (
        "thermodynamic",
        "The **laws of thermodynamics**:\n\
0. Systems in thermal equilibrium with a third system are in equilibrium with each other.\n\
1. Energy is conserved: $\\Delta U = Q - W$.\n\
2. The entropy of an isolated system never decreases.\n\
3. Entropy approaches a constant minimum as temperature approaches absolute zero.\n\
Want to explore heat engines and efficiency next?",
    ),
    (
        "electro",
        "**Electromagnetism** unifies electricity and magnetism. It is summarized by Maxwell's \
equations, which describe how charges produce electric fields, how currents and changing \
electric fields produce magnetic fields, and how light emerges as an electromagnetic wave.\n\
A good starting point is Coulomb's law: $F = k q_1 q_2 / r^2$.",
    ),
    (
        "wave",
        "**Waves** transfer energy without transferring matter. Every wave is characterized by its \
*wavelength*, *frequency* and *amplitude*, related by $v = f \\lambda$.\n\
Waves can be *transverse* (like light) or *longitudinal* (like sound), and they show \
interference, diffraction and reflection.",
    ),
    (
        "energy",
        "**Energy** is the capacity to do work. The main forms in mechanics are kinetic energy, \
$KE = \\frac{1}{2}mv^2$, and gravitational potential energy, $PE = mgh$.\n\
The *conservation of energy* says the total energy of an isolated system stays constant; it \
only changes form.",
    ),
    (
        "momentum",
        "**Momentum** is mass in motion: $p = mv$.\n\
In a closed system total momentum is conserved, which is what makes collision problems \
solvable. Here's a quick calculation:\n\
```python\nm1, v1 = 2.0, 3.0\nm2, v2 = 1.0, 0.0\nv_final = (m1 * v1 + m2 * v2) / (m1 + m2)\nprint(v_final)  # perfectly inelastic collision\n```",
    ),
    (
        "gravity",
        "**Gravity** is the attraction between masses. Newton's law of universal gravitation gives \
$F = G m_1 m_2 / r^2$, and near Earth's surface objects accelerate at about $g = 9.81$ m/s².\n\
General relativity refines this picture by describing gravity as spacetime curvature.",
    ),
];

/// Canned replies chosen by the first keyword found in the lowercased prompt.
#[derive(Debug, Clone, Default)]
pub struct KeywordResolver;

impl KeywordResolver {
    pub fn new() -> Self {
        Self
    }

    pub fn lookup(&self, prompt: &str) -> &'static str {
        let lowered = prompt.to_lowercase();
        RESPONSES
            .iter()
            .find(|(keyword, _)| lowered.contains(keyword))
            .map(|(_, response)| *response)
            .unwrap_or(DEFAULT_RESPONSE)
    }
}

#[async_trait]
impl ResponseResolver for KeywordResolver {
    async fn resolve(&self, prompt: &str) -> Result<String, ResolveError> {
        Ok(self.lookup(prompt).to_string())
    }
}

/// Artificial response delay window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Latency {
    None,
    Between(RangeInclusive<Duration>),
}

impl Latency {
    /// Bounds may be given in either order; a window of `0..=0` disables
    /// the delay.
    pub fn from_millis(min_ms: u64, max_ms: u64) -> Self {
        let (low, high) = if min_ms <= max_ms {
            (min_ms, max_ms)
        } else {
            (max_ms, min_ms)
        };
        if high == 0 {
            return Self::None;
        }
        Self::Between(Duration::from_millis(low)..=Duration::from_millis(high))
    }

    fn sample(&self) -> Duration {
        match self {
            Self::None => Duration::ZERO,
            Self::Between(range) => {
                let low = range.start().as_millis() as u64;
                let high = range.end().as_millis() as u64;
                Duration::from_millis(rand::rng().random_range(low..=high))
            }
        }
    }
}

/// Wraps a resolver with a random delay and an optional failure rate, so a
/// local lookup paces like a remote call.
pub struct SimulatedNetwork<R> {
    inner: R,
    latency: Latency,
    failure_rate: f64,
}

impl<R> SimulatedNetwork<R> {
    pub fn new(inner: R, latency: Latency) -> Self {
        Self {
            inner,
            latency,
            failure_rate: 0.0,
        }
    }

    pub fn with_failure_rate(mut self, failure_rate: f64) -> Self {
        self.failure_rate = if failure_rate.is_finite() {
            failure_rate.clamp(0.0, 1.0)
        } else {
            0.0
        };
        self
    }
}

#[async_trait]
impl<R: ResponseResolver> ResponseResolver for SimulatedNetwork<R> {
    async fn resolve(&self, prompt: &str) -> Result<String, ResolveError> {
        let delay = self.latency.sample();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let failed = self.failure_rate > 0.0 && rand::rng().random_bool(self.failure_rate);
        if failed {
            tracing::debug!("simulating resolver failure");
            return Err(ResolveError::Network);
        }

        self.inner.resolve(prompt).await
    }
}

/// Resolves `prompt` on its own task, so a resolver that panics still
/// produces a result for the waiting conversation.
pub async fn resolve_detached(
    resolver: Arc<dyn ResponseResolver>,
    prompt: String,
) -> Result<String, ResolveError> {
    let task = tokio::spawn(async move { resolver.resolve(&prompt).await });
    match task.await {
        Ok(result) => result,
        Err(err) => {
            tracing::error!("resolver task failed: {err}");
            Err(ResolveError::Backend(err.to_string()))
        }
    }
}
