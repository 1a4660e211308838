use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about)]
pub struct Args {
    /// RNG seed for reproducible pieces (random when omitted)
    #[arg(long)]
    pub seed: Option<u64>,

    /// Major key, e.g. C, G, F#, Bb (overrides config)
    #[arg(long)]
    pub key: Option<String>,

    /// Time signature, e.g. 4/4, 3/4, 6/8 (overrides config)
    #[arg(long)]
    pub timesig: Option<String>,

    /// Difficulty: easy, medium or hard (overrides config)
    #[arg(long)]
    pub difficulty: Option<String>,

    /// Max simultaneous notes requested per hand, 1-10 (overrides config)
    #[arg(long)]
    pub polyphony: Option<u8>,

    /// Number of graded targets to generate (overrides config)
    #[arg(long)]
    pub targets: Option<usize>,

    /// Tempo in beats per minute (overrides config)
    #[arg(long)]
    pub bpm: Option<f32>,

    /// Path to config TOML
    #[arg(long, default_value = "sightline.toml")]
    pub config: String,

    /// Write the generated piece as JSON to this path
    #[arg(long)]
    pub json: Option<String>,

    /// Run a scripted performance against the piece and report stats
    #[arg(long, default_value_t = false)]
    pub simulate: bool,

    /// Simulation time scale (1.0 = real time)
    #[arg(long, default_value_t = 8.0)]
    pub speed: f32,

    /// Probability of an injected wrong note per target in simulation
    #[arg(long, default_value_t = 0.0)]
    pub flub: f32,
}
