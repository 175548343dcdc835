//! Single-layer LSTM regressor with a linear head
//!
//! Scalar input per step, `hidden` units, one scalar output read from the
//! last hidden state. All parameters live in one flat vector so the optimizer
//! and gradient clipping treat them uniformly:
//!
//! ```text
//! [ w_x (4H) | w_h (4H x H, row-major) | b (4H) | w_y (H) | b_y (1) ]
//! ```
//!
//! Gate rows are ordered input, forget, candidate, output.

use rand::Rng;

const INPUT: usize = 0;
const FORGET: usize = 1;
const CANDIDATE: usize = 2;
const OUTPUT: usize = 3;

#[derive(Debug, Clone)]
pub(crate) struct Lstm {
    hidden: usize,
    params: Vec<f64>,
}

/// Activations of one time step, kept for backpropagation
struct Step {
    x: f64,
    h_prev: Vec<f64>,
    c_prev: Vec<f64>,
    /// Post-activation gates, `4H` long
    gates: Vec<f64>,
    tanh_c: Vec<f64>,
}

struct Trace {
    steps: Vec<Step>,
    h: Vec<f64>,
    y: f64,
}

impl Lstm {
    /// Uniform(-1/sqrt(H), 1/sqrt(H)) weights, zero biases except the forget
    /// gate, which starts at 1.0
    pub fn new<R: Rng + ?Sized>(hidden: usize, rng: &mut R) -> Self {
        let bound = 1.0 / (hidden as f64).sqrt();
        let mut lstm = Self {
            hidden,
            params: vec![0.0; Self::param_count(hidden)],
        };

        let weights = lstm.wx_range().chain(lstm.wh_range()).chain(lstm.wy_range());
        for i in weights {
            lstm.params[i] = rng.gen_range(-bound..bound);
        }
        let b = lstm.b_offset();
        for j in 0..hidden {
            lstm.params[b + FORGET * hidden + j] = 1.0;
        }

        lstm
    }

    pub fn param_count(hidden: usize) -> usize {
        4 * hidden + 4 * hidden * hidden + 4 * hidden + hidden + 1
    }

    pub fn params(&self) -> &[f64] {
        &self.params
    }

    pub fn params_mut(&mut self) -> &mut [f64] {
        &mut self.params
    }

    pub fn predict(&self, xs: &[f64]) -> f64 {
        self.forward(xs).y
    }

    /// Accumulate `d(loss)/d(params)` into `grads` for one sequence, given
    /// `d(loss)/d(output)` as a function of the output. Returns the output.
    pub fn accumulate_gradients(
        &self,
        xs: &[f64],
        grads: &mut [f64],
        d_output: impl FnOnce(f64) -> f64,
    ) -> f64 {
        let h_size = self.hidden;
        let trace = self.forward(xs);
        let dy = d_output(trace.y);

        let wh = self.wh_offset();
        let b = self.b_offset();
        let wy = self.wy_offset();
        let by = self.by_offset();

        for j in 0..h_size {
            grads[wy + j] += dy * trace.h[j];
        }
        grads[by] += dy;

        let mut dh: Vec<f64> = (0..h_size).map(|j| dy * self.params[wy + j]).collect();
        let mut dc = vec![0.0; h_size];
        let mut da = vec![0.0; 4 * h_size];

        for step in trace.steps.iter().rev() {
            for j in 0..h_size {
                let i = step.gates[INPUT * h_size + j];
                let f = step.gates[FORGET * h_size + j];
                let g = step.gates[CANDIDATE * h_size + j];
                let o = step.gates[OUTPUT * h_size + j];
                let tc = step.tanh_c[j];

                let d_o = dh[j] * tc;
                dc[j] += dh[j] * o * (1.0 - tc * tc);
                let d_i = dc[j] * g;
                let d_g = dc[j] * i;
                let d_f = dc[j] * step.c_prev[j];

                da[INPUT * h_size + j] = d_i * i * (1.0 - i);
                da[FORGET * h_size + j] = d_f * f * (1.0 - f);
                da[CANDIDATE * h_size + j] = d_g * (1.0 - g * g);
                da[OUTPUT * h_size + j] = d_o * o * (1.0 - o);

                dc[j] *= f;
            }

            for (r, &d) in da.iter().enumerate() {
                grads[r] += d * step.x;
                grads[b + r] += d;
                let row = wh + r * h_size;
                for (k, hp) in step.h_prev.iter().enumerate() {
                    grads[row + k] += d * hp;
                }
            }

            for (k, dh_k) in dh.iter_mut().enumerate() {
                *dh_k = da
                    .iter()
                    .enumerate()
                    .map(|(r, d)| self.params[wh + r * h_size + k] * d)
                    .sum();
            }
        }

        trace.y
    }

    fn forward(&self, xs: &[f64]) -> Trace {
        let h_size = self.hidden;
        let wh = self.wh_offset();
        let b = self.b_offset();
        let wy = self.wy_offset();

        let mut h = vec![0.0; h_size];
        let mut c = vec![0.0; h_size];
        let mut steps = Vec::with_capacity(xs.len());

        for &x in xs {
            let mut gates: Vec<f64> = (0..4 * h_size)
                .map(|r| {
                    let row = &self.params[wh + r * h_size..wh + (r + 1) * h_size];
                    let recurrent: f64 = row.iter().zip(&h).map(|(w, hk)| w * hk).sum();
                    self.params[r] * x + self.params[b + r] + recurrent
                })
                .collect();

            for (r, a) in gates.iter_mut().enumerate() {
                *a = if r / h_size == CANDIDATE {
                    a.tanh()
                } else {
                    sigmoid(*a)
                };
            }

            let c_prev = c.clone();
            let h_prev = h.clone();
            let mut tanh_c = vec![0.0; h_size];
            for j in 0..h_size {
                let i = gates[INPUT * h_size + j];
                let f = gates[FORGET * h_size + j];
                let g = gates[CANDIDATE * h_size + j];
                let o = gates[OUTPUT * h_size + j];
                c[j] = f * c_prev[j] + i * g;
                tanh_c[j] = c[j].tanh();
                h[j] = o * tanh_c[j];
            }

            steps.push(Step {
                x,
                h_prev,
                c_prev,
                gates,
                tanh_c,
            });
        }

        let y = self.params[wy..wy + h_size]
            .iter()
            .zip(&h)
            .map(|(w, hj)| w * hj)
            .sum::<f64>()
            + self.params[self.by_offset()];

        Trace { steps, h, y }
    }

    fn wh_offset(&self) -> usize {
        4 * self.hidden
    }

    fn b_offset(&self) -> usize {
        self.wh_offset() + 4 * self.hidden * self.hidden
    }

    fn wy_offset(&self) -> usize {
        self.b_offset() + 4 * self.hidden
    }

    fn by_offset(&self) -> usize {
        self.wy_offset() + self.hidden
    }

    fn wx_range(&self) -> std::ops::Range<usize> {
        0..self.wh_offset()
    }

    fn wh_range(&self) -> std::ops::Range<usize> {
        self.wh_offset()..self.b_offset()
    }

    fn wy_range(&self) -> std::ops::Range<usize> {
        self.wy_offset()..self.by_offset()
    }
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Adam optimizer state over a flat parameter vector
#[derive(Debug, Clone)]
pub(crate) struct Adam {
    learning_rate: f64,
    beta1: f64,
    beta2: f64,
    epsilon: f64,
    m: Vec<f64>,
    v: Vec<f64>,
    t: i32,
}

impl Adam {
    pub fn new(size: usize, learning_rate: f64) -> Self {
        Self {
            learning_rate,
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-8,
            m: vec![0.0; size],
            v: vec![0.0; size],
            t: 0,
        }
    }

    pub fn step(&mut self, params: &mut [f64], grads: &[f64]) {
        self.t += 1;
        let correction1 = 1.0 - self.beta1.powi(self.t);
        let correction2 = 1.0 - self.beta2.powi(self.t);

        for (((p, g), m), v) in params
            .iter_mut()
            .zip(grads)
            .zip(self.m.iter_mut())
            .zip(self.v.iter_mut())
        {
            *m = self.beta1 * *m + (1.0 - self.beta1) * g;
            *v = self.beta2 * *v + (1.0 - self.beta2) * g * g;
            let m_hat = *m / correction1;
            let v_hat = *v / correction2;
            *p -= self.learning_rate * m_hat / (v_hat.sqrt() + self.epsilon);
        }
    }
}

/// Rescale `grads` so its L2 norm is at most `max_norm`; returns the
/// norm before clipping
pub(crate) fn clip_gradients(grads: &mut [f64], max_norm: f64) -> f64 {
    let norm = grads.iter().map(|g| g * g).sum::<f64>().sqrt();
    if norm > max_norm && norm > 0.0 {
        let scale = max_norm / norm;
        for g in grads.iter_mut() {
            *g *= scale;
        }
    }
    norm
}
