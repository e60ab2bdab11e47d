//!
//! Swarm node firmware.
//!
//! Interrupt handlers only disable their alert line and raise a flag, or keep
//! USB alive.  Everything else runs in `idle`, one [`Node::step`] at a time.
//!

#![no_std]
#![no_main]

use teensy4_panic as _;

#[rtic::app(device = teensy4_bsp, peripherals = true)]
mod app {
    use embedded_hal::spi::MODE_3;
    use imxrt_iomuxc::{configure, Config, PullKeeper};
    use usb_device::bus::UsbBusAllocator;

    use teensy4_bsp as bsp;
    use bsp::board::{self, LPSPI_FREQUENCY, PERCLK_FREQUENCY};
    use bsp::hal;
    use hal::flexpwm::Output;
    use hal::lpspi::Pins;
    use hal::timer::Blocking;
    use hal::usbd::BusAdapter;

    use ina226_driver::{Calibration, Ina226};
    use mpu6500_driver::Mpu6500;
    use swarmnode_control::Node;

    use swarmnode_firmware::config::{
        IMU_SPI_FREQUENCY, INA226_ADDRESS, MAX_CURRENT_UA, SHUNT_UOHM,
    };
    use swarmnode_firmware::{
        alert_edge, configure_imu, configure_power_monitor, AlertPins, Bus, Hardware,
        MicrosecondClock, NodeBoard, PitDelay, ServoBank, ServoModules, ServoPins, UsbSerial,
        EP_MEMORY, EP_STATE, LOGGER, PENDING, SPEED,
    };

    /// Charge, dock and alert lines idle high.
    const PULL_UP: Config = Config::zero().set_pull_keeper(Some(PullKeeper::Pullup100k));

    #[local]
    struct Local {
        hardware: Hardware,
        node: Node,
    }

    #[shared]
    struct Shared {
        alerts: AlertPins,
        usb: UsbSerial,
    }

    #[init(local = [bus: Option<UsbBusAllocator<Bus>> = None])]
    fn init(ctx: init::Context) -> (Shared, Local) {
        // Grab the board peripherals
        let board::Resources {
            mut pins,
            mut gpio1,
            usb,
            lpi2c1,
            lpspi4,
            gpt1,
            pit: (_pit0, _pit1, pit2, _pit3),
            flexpwm1,
            flexpwm2,
            flexpwm4,
            ..
        } = board::t41(ctx.device);

        // Without a logger there is nowhere to report anything, so carry on.
        LOGGER.init().ok();

        // Initialize USB //

        let bus = BusAdapter::with_speed(usb, &EP_MEMORY, &EP_STATE, SPEED);
        bus.set_interrupts(true);
        let bus = ctx.local.bus.insert(UsbBusAllocator::new(bus));
        let usb = UsbSerial::new(bus);

        // Initialize Timers //

        let clock = MicrosecondClock::new(gpt1);
        let mut delay: PitDelay = Blocking::<_, PERCLK_FREQUENCY>::from_pit(pit2);

        // Initialize IMU //

        let imu_spi_pins = Pins {
            pcs0: pins.p10,
            sck: pins.p13,
            sdo: pins.p11,
            sdi: pins.p12,
        };
        let mut imu_spi = hal::lpspi::Lpspi::new(lpspi4, imu_spi_pins);
        imu_spi.disabled(|spi| {
            spi.set_clock_hz(LPSPI_FREQUENCY, IMU_SPI_FREQUENCY);
            spi.set_mode(MODE_3);
        });
        let mut imu = Mpu6500::new(imu_spi);
        let imu_active_low = configure_imu(&mut imu, &mut delay);

        // Initialize Power Monitor //

        let i2c = board::lpi2c(lpi2c1, pins.p19, pins.p18, board::Lpi2cClockSpeed::KHz400);
        let mut power_monitor = Ina226::new(
            i2c,
            INA226_ADDRESS,
            Calibration::new(MAX_CURRENT_UA, SHUNT_UOHM),
        );
        let power_active_low = configure_power_monitor(&mut power_monitor);

        // Initialize Inputs //

        configure(&mut pins.p14, PULL_UP);
        configure(&mut pins.p15, PULL_UP);
        configure(&mut pins.p16, PULL_UP);
        configure(&mut pins.p17, PULL_UP);
        configure(&mut pins.p38, PULL_UP);
        configure(&mut pins.p41, PULL_UP);
        let charge = (
            gpio1.input(pins.p14),
            gpio1.input(pins.p15),
            gpio1.input(pins.p16),
            gpio1.input(pins.p17),
        );
        let connect = gpio1.input(pins.p38);

        let imu_alert = gpio1.input(pins.p40);
        let power_alert = gpio1.input(pins.p41);
        let alerts = AlertPins::new(
            gpio1,
            imu_alert,
            alert_edge(imu_active_low),
            power_alert,
            alert_edge(power_active_low),
        );

        // Initialize Servos //

        let (pwm1, (_, _, _, pwm1_sm3)) = flexpwm1;
        let (pwm2, (pwm2_sm0, _, pwm2_sm2, pwm2_sm3)) = flexpwm2;
        let (pwm4, (pwm4_sm0, pwm4_sm1, pwm4_sm2, _)) = flexpwm4;
        let servo_pins = ServoPins {
            p8: Output::new_a(pins.p8),
            p7: Output::new_b(pins.p7),
            p4: Output::new_a(pins.p4),
            p33: Output::new_b(pins.p33),
            p6: Output::new_a(pins.p6),
            p9: Output::new_b(pins.p9),
            p36: Output::new_a(pins.p36),
            p37: Output::new_b(pins.p37),
            p2: Output::new_a(pins.p2),
            p3: Output::new_b(pins.p3),
            p22: Output::new_a(pins.p22),
            p23: Output::new_a(pins.p23),
        };
        let servos = ServoBank::new(
            ServoModules {
                pwm1,
                pwm2,
                pwm4,
                pwm1_sm3,
                pwm2_sm0,
                pwm2_sm2,
                pwm2_sm3,
                pwm4_sm0,
                pwm4_sm1,
                pwm4_sm2,
            },
            servo_pins,
        )
        .into_leg_servos();

        (
            Shared { alerts, usb },
            Local {
                hardware: Hardware {
                    imu,
                    power_monitor,
                    charge,
                    connect,
                    servos,
                    clock,
                    delay,
                },
                node: Node::new(),
            },
        )
    }

    #[idle(shared = [alerts, usb], local = [hardware, node])]
    fn idle(ctx: idle::Context) -> ! {
        let node = ctx.local.node;
        let mut board = NodeBoard::new(ctx.local.hardware, ctx.shared.alerts, ctx.shared.usb);

        node.startup(&mut board);
        loop {
            node.step(&mut board, &PENDING);
        }
    }

    /// Both sensor alert lines.
    #[task(binds = GPIO1_COMBINED_16_31, shared = [alerts], priority = 2)]
    fn alert_interrupt(mut ctx: alert_interrupt::Context) {
        ctx.shared.alerts.lock(|alerts| alerts.disarm_fired(&PENDING));
    }

    /// This task runs when the USB1 interrupt activates.
    #[task(binds = USB_OTG1, shared = [usb], priority = 2)]
    fn usb_interrupt(mut ctx: usb_interrupt::Context) {
        ctx.shared.usb.lock(|usb| usb.poll());
    }
}
