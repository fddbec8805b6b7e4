//! ECG capture from a MAX30003 on a Linux spidev bus
//!
//! Configures the chip from settings files, `ECG_*` environment variables and
//! command-line options (highest precedence), collects one session of samples
//! and prints one sample per line on stdout. Logs go to stderr.
//!
//! # Usage
//!
//! ```bash
//! # 2048 samples at 256 sps, gain 160
//! ecg-capture -D /dev/spidev0.0 -S 256 -g 160 --samples 2048
//!
//! # Strict FIFO decoding with debug logging
//! ecg-capture --strict --log-level debug
//! ```

use clap::Parser;
use ecg_core::acquisition::{AcquisitionReport, AcquisitionSession};
use ecg_core::config::{ConfigLoader, EcgSettings};
use ecg_core::device::{DecodeMode, Max30003};
use ecg_core::hal::{BitOrder, LinuxSpiTransport};
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

/// MAX30003 ECG capture
#[derive(Parser, Debug)]
#[command(name = "ecg-capture")]
#[command(author, version, about = "Capture ECG samples from a MAX30003 over SPI", long_about = None)]
struct Cli {
    /// Logging verbosity level (overridden by RUST_LOG)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Extra settings file, applied after the standard search paths
    #[arg(long)]
    config: Option<PathBuf>,

    /// SPI device to use
    #[arg(short = 'D', long)]
    device: Option<String>,

    /// Max bus speed (Hz)
    #[arg(short = 's', long)]
    speed: Option<u32>,

    /// Bits per word
    #[arg(short = 'b', long)]
    bpw: Option<u8>,

    /// Shift least significant bit first
    #[arg(short = 'L', long)]
    lsb: bool,

    /// Samples to collect
    #[arg(long)]
    samples: Option<usize>,

    /// Acquisition window in seconds (0 selects the default)
    #[arg(long)]
    timeout: Option<u64>,

    /// Pause between polls in milliseconds (0 busy-polls)
    #[arg(long)]
    poll_interval: Option<u64>,

    /// Read the FIFO only on EINT and accept words by ETAG
    #[arg(long)]
    strict: bool,

    /// Gain: 20, 40, 80, 160 V/V
    #[arg(short = 'g', long)]
    gain: Option<u32>,

    /// Sample rate: 128, 256, 512 sps
    #[arg(short = 'S', long = "s_rate")]
    s_rate: Option<u32>,

    /// High-pass cutoff: 1 bypass, 2 0.5 Hz
    #[arg(short = 'H', long = "hp_freq")]
    hp_freq: Option<u32>,

    /// Low-pass cutoff: 0 bypass, 40, 100, 150 Hz
    #[arg(long = "lp_freq")]
    lp_freq: Option<u32>,

    /// FIFO interrupt threshold: 1, 2, 16 samples
    #[arg(short = 'e', long)]
    efit: Option<u32>,

    /// R-event clear: 0 on STATUS read, 1 on RTOR read, 2 self-clear
    #[arg(short = 'p', long = "print_it")]
    print_it: Option<u32>,

    /// Sample-pulse clear: 1 self-clear, 2 on STATUS read
    #[arg(short = 'a', long = "samp_clr_auto")]
    samp_clr_auto: Option<u32>,

    /// Sample-pulse frequency: every 1, 2, 4, 16 samples
    #[arg(short = 'f', long = "ssp_freq")]
    ssp_freq: Option<u32>,

    /// ECG channel: 1 enable, 2 disable
    #[arg(short = 'E', long = "ecg_en")]
    ecg_en: Option<u32>,

    /// Ultra-low-power lead-on detection: 1 enable, 2 disable
    #[arg(short = 'u', long = "ulp_en")]
    ulp_en: Option<u32>,

    /// DC lead-off detection: 1 enable, 2 disable
    #[arg(short = 'l', long = "leadoff_en")]
    leadoff_en: Option<u32>,

    /// Lead-off current polarity: 1 ECGP pull-up, 2 ECGP pull-down
    #[arg(short = 'P', long = "dc_pol")]
    dc_pol: Option<u32>,

    /// Lead-off current: 0, 5, 10, 20, 50, 100 nA
    #[arg(short = 'm', long = "leadoff_mag")]
    leadoff_mag: Option<u32>,

    /// Lead-off threshold: 300, 400, 450, 500 mV
    #[arg(short = 'v', long = "leadoff_vol")]
    leadoff_vol: Option<u32>,

    /// Resistive bias: 1 enable, 2 disable
    #[arg(short = 'B', long = "rbias_en")]
    rbias_en: Option<u32>,

    /// Resistive bias value: 50, 100, 200 MΩ
    #[arg(short = 'r', long = "rbias_val")]
    rbias_val: Option<u32>,

    /// Resistive bias inputs: 0 none, 1 ECGN, 2 ECGP, 3 both
    #[arg(short = 'i', long = "rbias_in")]
    rbias_in: Option<u32>,

    /// Calibration source: 1 enable, 2 disable
    #[arg(short = 'c', long = "cal_en")]
    cal_en: Option<u32>,

    /// Calibration mode: 1 bipolar, 2 unipolar
    #[arg(short = 'o', long = "cal_bipol")]
    cal_bipol: Option<u32>,

    /// Calibration magnitude: 1 0.50 mV, 2 0.25 mV
    #[arg(short = 'C', long = "cal_mag")]
    cal_mag: Option<u32>,

    /// Calibration frequency in mHz: 256000, 64000, 16000, 4000, 1000, 250, 62, 16
    #[arg(short = 'F', long = "cal_freq")]
    cal_freq: Option<u32>,

    /// Input polarity: 1 inverted, 2 non-inverted
    #[arg(short = 'I', long = "inv_pol")]
    inv_pol: Option<u32>,

    /// Input switch: 1 isolate ECGP, 2 isolate ECGN, 3 connect ECGN, 4 connect ECGP
    #[arg(short = 'N', long = "inp_swt")]
    inp_swt: Option<u32>,

    /// ECGP calibration: 1 VMID, 2 VCALP, 3 VCALN, 4 none
    #[arg(short = 't', long = "calp_sel")]
    calp_sel: Option<u32>,

    /// ECGN calibration: 1 VMID, 2 VCALP, 3 VCALN, 4 none
    #[arg(short = 'T', long = "caln_sel")]
    caln_sel: Option<u32>,
}

impl Cli {
    /// Command-line values win over every settings layer
    fn apply_to(&self, settings: &mut EcgSettings) {
        let bus = &mut settings.bus;
        if let Some(device) = &self.device {
            bus.device = device.clone();
        }
        bus.max_speed_hz = self.speed.unwrap_or(bus.max_speed_hz);
        bus.bits_per_word = self.bpw.unwrap_or(bus.bits_per_word);
        if self.lsb {
            bus.bit_order = BitOrder::LsbFirst;
        }

        let acq = &mut settings.acquisition;
        acq.sample_count = self.samples.unwrap_or(acq.sample_count);
        acq.timeout_secs = self.timeout.unwrap_or(acq.timeout_secs);
        acq.poll_interval_ms = self.poll_interval.unwrap_or(acq.poll_interval_ms);
        if self.strict {
            acq.decode_mode = DecodeMode::Strict;
        }

        let regs = &mut settings.registers;
        regs.gain = self.gain.or(regs.gain);
        regs.sample_rate = self.s_rate.or(regs.sample_rate);
        regs.high_pass = self.hp_freq.or(regs.high_pass);
        regs.low_pass = self.lp_freq.or(regs.low_pass);
        regs.fifo_threshold = self.efit.or(regs.fifo_threshold);
        regs.rtor_clear = self.print_it.or(regs.rtor_clear);
        regs.sample_clear = self.samp_clr_auto.or(regs.sample_clear);
        regs.sample_pulse_frequency = self.ssp_freq.or(regs.sample_pulse_frequency);
        regs.ecg_channel = self.ecg_en.or(regs.ecg_channel);
        regs.ulp_lead_on = self.ulp_en.or(regs.ulp_lead_on);
        regs.dc_lead_off = self.leadoff_en.or(regs.dc_lead_off);
        regs.lead_off_polarity = self.dc_pol.or(regs.lead_off_polarity);
        regs.lead_off_current = self.leadoff_mag.or(regs.lead_off_current);
        regs.lead_off_threshold = self.leadoff_vol.or(regs.lead_off_threshold);
        regs.resistive_bias = self.rbias_en.or(regs.resistive_bias);
        regs.bias_resistance = self.rbias_val.or(regs.bias_resistance);
        regs.bias_inputs = self.rbias_in.or(regs.bias_inputs);
        regs.calibration_source = self.cal_en.or(regs.calibration_source);
        regs.calibration_mode = self.cal_bipol.or(regs.calibration_mode);
        regs.calibration_magnitude = self.cal_mag.or(regs.calibration_magnitude);
        regs.calibration_frequency = self.cal_freq.or(regs.calibration_frequency);
        regs.input_polarity = self.inv_pol.or(regs.input_polarity);
        regs.input_switch = self.inp_swt.or(regs.input_switch);
        regs.positive_calibration = self.calp_sel.or(regs.positive_calibration);
        regs.negative_calibration = self.caln_sel.or(regs.negative_calibration);
    }
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn load_settings(cli: &Cli) -> Result<EcgSettings, Box<dyn std::error::Error>> {
    let mut loader = ConfigLoader::new();
    if let Some(path) = &cli.config {
        loader = loader.with_required_file(path)?;
    }
    let mut settings = loader.load()?;
    cli.apply_to(&mut settings);
    settings.validate()?;
    Ok(settings)
}

fn print_samples(report: &AcquisitionReport) -> io::Result<()> {
    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    for sample in &report.samples {
        writeln!(out, "{}", sample)?;
    }
    out.flush()
}

fn run(cli: &Cli) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let settings = load_settings(cli)?;

    let transport = LinuxSpiTransport::open_configured(&settings.bus)?;
    let mut device = Max30003::new(transport);
    let chip = device.read_info()?;
    if chip.looks_valid() {
        info!(revision = chip.revision(), "MAX30003 detected");
    } else {
        warn!(info = format_args!("0x{:06X}", chip.raw), "unexpected INFO register, is the chip connected?");
    }

    let mut session = AcquisitionSession::with_settings(device, &settings)?;
    match session.run() {
        Ok(report) => {
            print_samples(&report)?;
            if !report.warnings.is_empty() {
                warn!(count = report.warnings.len(), "session finished with warnings");
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(failure) if failure.is_partial() => {
            print_samples(&failure.report)?;
            error!(error = %failure.error, "printed partial capture");
            Ok(ExitCode::FAILURE)
        }
        Err(failure) => Err(failure.into()),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    info!("ecg-capture v{}", env!("CARGO_PKG_VERSION"));

    match run(&cli) {
        Ok(code) => code,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
