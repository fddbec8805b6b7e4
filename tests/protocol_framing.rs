// tests/protocol_framing.rs
//! Wire framing seen by the bus, through both transport seams

use ecg_core::acquisition::AcquisitionSession;
use ecg_core::device::{encode_write_frame, FifoSample, Max30003};
use ecg_core::error::{BusOperation, EcgError};
use ecg_core::hal::{BitOrder, BusSettings, EmbeddedHalTransport, Max30003Simulator, SpiTransport, TransportError};
use ecg_core::registers::{address, DeviceConfiguration, EcgGain};
use embedded_hal::spi::{ErrorKind, ErrorType, Operation, SpiDevice};
use std::time::Duration;

/// embedded-hal device whose far end is the simulator
struct SimulatedSpiDevice {
    chip: Max30003Simulator,
    transactions: usize,
}

impl SimulatedSpiDevice {
    fn new(chip: Max30003Simulator) -> Self {
        Self { chip, transactions: 0 }
    }
}

impl ErrorType for SimulatedSpiDevice {
    type Error = ErrorKind;
}

impl SpiDevice for SimulatedSpiDevice {
    fn transaction(&mut self, operations: &mut [Operation<'_, u8>]) -> Result<(), ErrorKind> {
        self.transactions += 1;
        let result: Result<(), TransportError> = match operations {
            [Operation::Write(output)] => self.chip.write(output),
            [Operation::Write(output), Operation::Read(input)] => self.chip.write_read(output, input),
            _ => return Err(ErrorKind::Other),
        };
        result.map_err(|_| ErrorKind::Other)
    }
}

#[test]
fn test_init_frames_on_the_wire() {
    let mut sim = Max30003Simulator::new();
    sim.push_samples([1]);
    let config = DeviceConfiguration {
        sample_count: 1,
        timeout: Duration::from_secs(1),
        ..DeviceConfiguration::default()
    }
    .with(EcgGain::V160);

    AcquisitionSession::new(Max30003::new(&mut sim), config).run().unwrap();

    let frames = sim.frames();
    assert_eq!(frames[0], vec![0x10, 0x00, 0x00, 0x00]);
    assert_eq!(frames[1], encode_write_frame(address::CNFG_GEN, 0x08_1007).to_vec());
    assert_eq!(frames[4], vec![0x2A, 0x83, 0x70, 0x00]);
    assert_eq!(frames[7], vec![0x12, 0x00, 0x00, 0x00]);
    // STATUS read request, then the FIFO read request
    assert_eq!(frames[8], vec![0x03]);
    assert_eq!(frames[9], vec![0x43]);
}

#[test]
fn test_every_write_frame_has_write_flag_clear() {
    let mut sim = Max30003Simulator::new();
    sim.push_samples([1, 2]);
    let config = DeviceConfiguration {
        sample_count: 2,
        timeout: Duration::from_secs(1),
        ..DeviceConfiguration::default()
    };
    AcquisitionSession::new(Max30003::new(&mut sim), config).run().unwrap();

    for frame in sim.frames() {
        match frame.len() {
            4 => assert_eq!(frame[0] & 0x01, 0, "write frame {:02X?}", frame),
            1 => assert_eq!(frame[0] & 0x01, 1, "read request {:02X?}", frame),
            n => panic!("unexpected frame length {}", n),
        }
    }
}

#[test]
fn test_session_over_embedded_hal_device() {
    let mut chip = Max30003Simulator::new();
    chip.push_samples([-7, 0x1_2345, 42]);
    let transport = EmbeddedHalTransport::new(SimulatedSpiDevice::new(chip));

    let mut device = Max30003::new(transport);
    device.configure_bus(&BusSettings::default()).unwrap();
    let info = device.read_info().unwrap();
    assert!(info.looks_valid());
    assert_eq!(info.revision(), 1);

    let config = DeviceConfiguration {
        sample_count: 3,
        timeout: Duration::from_secs(1),
        ..DeviceConfiguration::default()
    };
    let mut session = AcquisitionSession::new(device, config);
    let report = session.run().unwrap();
    let readings: Vec<i32> = report.samples.iter().map(|v| v >> 14).collect();
    assert_eq!(readings, vec![-7, 0x1_2345, 42]);

    let spi = session.into_device().into_transport().into_inner();
    // INFO, 8 init writes, then one STATUS and one FIFO read per sample
    assert_eq!(spi.transactions, 1 + 8 + 6);
    assert_eq!(spi.chip.register(address::CNFG_ECG), DeviceConfiguration::default().cnfg_ecg);
}

#[test]
fn test_embedded_hal_errors_surface_as_bus_errors() {
    let mut chip = Max30003Simulator::new();
    chip.fail_reads_of(address::ECG_FIFO);
    let mut device = Max30003::new(EmbeddedHalTransport::new(SimulatedSpiDevice::new(chip)));

    assert!(device.read_status().is_ok());
    match device.read_fifo_sample() {
        Err(EcgError::Bus { operation, address: Some(addr), source, .. }) => {
            assert_eq!(operation, BusOperation::Read);
            assert_eq!(addr, address::ECG_FIFO);
            assert!(matches!(source, TransportError::Spi(ErrorKind::Other)));
        }
        other => panic!("Expected bus read error, got {:?}", other),
    }
}

#[test]
fn test_embedded_hal_rejects_lsb_first_bus() {
    let mut device = Max30003::new(EmbeddedHalTransport::new(SimulatedSpiDevice::new(
        Max30003Simulator::new(),
    )));
    let settings = BusSettings {
        bit_order: BitOrder::LsbFirst,
        ..BusSettings::default()
    };
    assert!(matches!(
        device.configure_bus(&settings),
        Err(EcgError::Bus { operation: BusOperation::Configure, .. })
    ));
}

#[test]
fn test_fifo_word_through_register_read() {
    let mut sim = Max30003Simulator::new();
    sim.push_fifo_words([[0xFF, 0xFF, 0xC7]]);
    let mut device = Max30003::new(sim);

    let sample = device.read_fifo_sample().unwrap();
    assert_eq!(sample, FifoSample::from_bytes([0xFF, 0xFF, 0xC7]));
    assert_eq!(sample.sample_18bit(), -1);
    assert_eq!(sample.ptag(), 7);
    assert_eq!(device.transport().read_count(address::ECG_FIFO), 1);
}
