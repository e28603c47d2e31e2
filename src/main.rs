#![no_std]
#![no_main]

use defmt_rtt as _;
use panic_probe as _;
use rtic::app;

#[app(device = rp_pico::hal::pac, peripherals = true, dispatchers = [SW0_IRQ])]
mod app {
    use ring_clock::config::{self, FaceConfig};
    use ring_clock::ring::{fault_alarm, LedRing};
    use ring_clock::rtc::Ds1307;
    use ring_clock::speech::SpeechQueue;
    use ring_clock::{ChangeListener, Clock, Tick, TimeSource};
    use rp_pico::hal::{
        clocks::{init_clocks_and_plls, Clock as _},
        fugit::{ExtU32, RateExtU32},
        gpio::{
            bank0::{Gpio2, Gpio4, Gpio5},
            FunctionI2C, FunctionPio0, Pin, PullDown, PullUp,
        },
        i2c::I2C,
        pac,
        pio::{PIOExt, SM0},
        sio::Sio,
        timer::{Alarm, Alarm0, CountDown, Timer},
        watchdog::Watchdog,
    };
    use ws2812_pio::Ws2812;

    // DS1307 on I2C0
    type Sda = Pin<Gpio4, FunctionI2C, PullUp>;
    type Scl = Pin<Gpio5, FunctionI2C, PullUp>;
    type RtcBus = I2C<pac::I2C0, (Sda, Scl)>;

    // WS2812 ring data line on GP2
    type RingDriver = Ws2812<pac::PIO0, SM0, CountDown, Pin<Gpio2, FunctionPio0, PullDown>>;

    const TICK_US: u32 = config::TICK_MS * 1_000;

    #[shared]
    struct Shared {
        speech: SpeechQueue,
    }

    #[local]
    struct Local {
        clock: Clock<Ds1307<RtcBus>>,
        ring: LedRing<RingDriver>,
        timer: Timer,
        alarm: Alarm0,
        delay: cortex_m::delay::Delay,
    }

    fn now_ms(timer: &Timer) -> u64 {
        timer.get_counter().ticks() / 1_000
    }

    #[init]
    fn init(ctx: init::Context) -> (Shared, Local, init::Monotonics) {
        let mut pac = ctx.device;
        let mut watchdog = Watchdog::new(pac.WATCHDOG);
        let sio = Sio::new(pac.SIO);

        let external_xtal_freq_hz = 12_000_000u32;
        let clocks = init_clocks_and_plls(
            external_xtal_freq_hz,
            pac.XOSC,
            pac.CLOCKS,
            pac.PLL_SYS,
            pac.PLL_USB,
            &mut pac.RESETS,
            &mut watchdog,
        )
        .ok()
        .unwrap();

        let mut timer = Timer::new(pac.TIMER, &mut pac.RESETS, &clocks);
        let mut alarm = timer.alarm_0().unwrap();
        alarm.schedule(TICK_US.micros()).unwrap();
        alarm.enable_interrupt();

        let delay = cortex_m::delay::Delay::new(ctx.core.SYST, clocks.system_clock.freq().to_Hz());

        let pins = rp_pico::Pins::new(
            pac.IO_BANK0,
            pac.PADS_BANK0,
            sio.gpio_bank0,
            &mut pac.RESETS,
        );

        let sda: Sda = pins.gpio4.reconfigure();
        let scl: Scl = pins.gpio5.reconfigure();
        let i2c = I2C::i2c0(
            pac.I2C0,
            sda,
            scl,
            100.kHz(),
            &mut pac.RESETS,
            clocks.system_clock.freq(),
        );

        let (mut pio, sm0, _, _, _) = pac.PIO0.split(&mut pac.RESETS);
        let ws = Ws2812::new(
            pins.gpio2.into_function(),
            &mut pio,
            sm0,
            clocks.peripheral_clock.freq(),
            timer.count_down(),
        );
        let mut ring = LedRing::new(ws, config::LED_BRIGHTNESS);
        ring.off().ok();

        let fallback = config::fallback_datetime().unwrap();
        let time = TimeSource::new(Ds1307::new(i2c), fallback);
        let mut clock = Clock::new(time, FaceConfig::default());
        clock.init(now_ms(&timer));

        defmt::info!("Clock started, DST {}", clock.time().is_dst());

        (
            Shared {
                speech: SpeechQueue::new(),
            },
            Local {
                clock,
                ring,
                timer,
                alarm,
                delay,
            },
            init::Monotonics(),
        )
    }

    // Hardware Task: control loop tick
    #[task(binds = TIMER_IRQ_0, priority = 1, shared = [speech], local = [clock, ring, timer, alarm, delay])]
    fn timer_tick(mut ctx: timer_tick::Context) {
        ctx.local.alarm.clear_interrupt();
        ctx.local.alarm.schedule(TICK_US.micros()).ok();

        let now = now_ms(ctx.local.timer);
        match ctx.local.clock.tick(now) {
            Tick::Rendered { reading, edges, .. } => {
                if ctx.local.ring.flush(ctx.local.clock.frame()).is_err() {
                    defmt::warn!("LED ring write failed");
                }

                if edges.any_changed {
                    ctx.shared.speech.lock(|speech| speech.on_tick(&edges, &reading));
                }
                if edges.five_minute_changed() {
                    announce::spawn().ok();
                }
            }
            Tick::Unhealthy => {
                defmt::warn!("Resetting RTC in 10 seconds...");
                for color in fault_alarm() {
                    ctx.local.ring.show_solid(color).ok();
                    ctx.local.delay.delay_ms(config::ALARM_STEP_MS);
                }
                ctx.local.clock.recover(now_ms(ctx.local.timer));
            }
        }
    }

    // Software Task: hand the queued words to the sample player
    #[task(shared = [speech])]
    fn announce(mut ctx: announce::Context) {
        ctx.shared.speech.lock(|speech| {
            while let Some(sample) = speech.next_word() {
                defmt::info!("play sample {=u8}", sample);
            }
        });
    }
}
