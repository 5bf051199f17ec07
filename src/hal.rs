//! Module: hal
//!
//! Purpose: ESP32 implementation of [`LadderIo`]. The two sense wires
//! land on ADC1 through a 2:1 divider (the ladder idles near 5 V, the
//! ADC tops out well below that), the output line and the indicator are
//! LEDC PWM channels, and the configuration button is a plain input
//! with the internal pull-up.
//!
//! ADC and LEDC go through the raw IDF calls; the safe driver wrappers
//! buy nothing here and the channel setup is a handful of registers.

use esp_idf_svc::hal::delay::FreeRtos;
use esp_idf_svc::hal::gpio::{Gpio25, Input, PinDriver, Pull};
use esp_idf_svc::hal::peripheral::Peripheral;
use esp_idf_svc::sys::{self, EspError};

use crate::io::LadderIo;
use crate::sample::{sample_to_voltage, InputFrame};

/// ADC resolution used for the sense wires.
const ADC_BITS: u8 = 12;

/// Full-scale sense voltage after the input divider.
const SENSE_FULL_SCALE_V: f32 = 5.0;

/// Full-scale output voltage at 100% PWM duty.
const OUTPUT_FULL_SCALE_V: f32 = 5.0;

/// PWM carrier for the output line and the indicator.
const PWM_FREQ_HZ: u32 = 1000;

/// 8-bit LEDC duty range.
const DUTY_MAX: u32 = 255;

const ADC_WIDTH_BIT_12: u32 = 3;
const ADC_ATTEN_DB_11: u32 = 3;

/// Wire A sense input, ADC1 channel 6 (GPIO34).
const WIRE_A_CHANNEL: sys::adc_channel_t = sys::adc_channel_t_ADC_CHANNEL_6;
/// Wire B sense input, ADC1 channel 7 (GPIO35).
const WIRE_B_CHANNEL: sys::adc_channel_t = sys::adc_channel_t_ADC_CHANNEL_7;

/// Output line PWM, GPIO26 on LEDC channel 0.
const OUTPUT_GPIO: i32 = 26;
const OUTPUT_LEDC_CHANNEL: sys::ledc_channel_t = sys::ledc_channel_t_LEDC_CHANNEL_0;

/// Indicator PWM, GPIO27 on LEDC channel 1.
const INDICATOR_GPIO: i32 = 27;
const INDICATOR_LEDC_CHANNEL: sys::ledc_channel_t = sys::ledc_channel_t_LEDC_CHANNEL_1;

fn init_adc() {
    unsafe {
        sys::adc1_config_width(ADC_WIDTH_BIT_12);
        sys::adc1_config_channel_atten(WIRE_A_CHANNEL, ADC_ATTEN_DB_11);
        sys::adc1_config_channel_atten(WIRE_B_CHANNEL, ADC_ATTEN_DB_11);
    }
}

fn init_pwm() -> Result<(), EspError> {
    let timer_cfg = sys::ledc_timer_config_t {
        speed_mode: sys::ledc_mode_t_LEDC_LOW_SPEED_MODE,
        duty_resolution: sys::ledc_timer_bit_t_LEDC_TIMER_8_BIT,
        timer_num: sys::ledc_timer_t_LEDC_TIMER_0,
        freq_hz: PWM_FREQ_HZ,
        clk_cfg: sys::ledc_clk_cfg_t_LEDC_AUTO_CLK,
        ..Default::default()
    };
    sys::esp!(unsafe { sys::ledc_timer_config(&timer_cfg) })?;

    for (gpio, channel) in [
        (OUTPUT_GPIO, OUTPUT_LEDC_CHANNEL),
        (INDICATOR_GPIO, INDICATOR_LEDC_CHANNEL),
    ] {
        let channel_cfg = sys::ledc_channel_config_t {
            gpio_num: gpio,
            speed_mode: sys::ledc_mode_t_LEDC_LOW_SPEED_MODE,
            channel,
            intr_type: sys::ledc_intr_type_t_LEDC_INTR_DISABLE,
            timer_sel: sys::ledc_timer_t_LEDC_TIMER_0,
            duty: 0,
            hpoint: 0,
            ..Default::default()
        };
        sys::esp!(unsafe { sys::ledc_channel_config(&channel_cfg) })?;
    }
    Ok(())
}

fn read_adc(channel: sys::adc_channel_t) -> u16 {
    unsafe { sys::adc1_get_raw(channel) as u16 }
}

fn set_duty(channel: sys::ledc_channel_t, duty: u32) {
    unsafe {
        sys::ledc_set_duty(sys::ledc_mode_t_LEDC_LOW_SPEED_MODE, channel, duty);
        sys::ledc_update_duty(sys::ledc_mode_t_LEDC_LOW_SPEED_MODE, channel);
    }
}

fn level_to_duty(level: f32) -> u32 {
    let scaled = (level / OUTPUT_FULL_SCALE_V).clamp(0.0, 1.0);
    (scaled * DUTY_MAX as f32) as u32
}

/// Hardware [`LadderIo`] for the ESP32 board.
pub struct EspLadderIo<'d> {
    button: PinDriver<'d, Gpio25, Input>,
}

impl<'d> EspLadderIo<'d> {
    /// Configure ADC, PWM and the button input. GPIO25 is the
    /// configuration button, active low against the internal pull-up.
    pub fn new(button_pin: impl Peripheral<P = Gpio25> + 'd) -> Result<Self, EspError> {
        init_adc();
        init_pwm()?;

        let mut button = PinDriver::input(button_pin)?;
        button.set_pull(Pull::Up)?;

        Ok(Self { button })
    }
}

impl LadderIo for EspLadderIo<'_> {
    fn poll_inputs(&mut self) -> InputFrame {
        InputFrame {
            wire_a: sample_to_voltage(read_adc(WIRE_A_CHANNEL), ADC_BITS, SENSE_FULL_SCALE_V),
            wire_b: sample_to_voltage(read_adc(WIRE_B_CHANNEL), ADC_BITS, SENSE_FULL_SCALE_V),
            button: self.button.is_low(),
        }
    }

    fn set_output(&mut self, level: f32) {
        set_duty(OUTPUT_LEDC_CHANNEL, level_to_duty(level));
    }

    fn output_off(&mut self) {
        set_duty(OUTPUT_LEDC_CHANNEL, 0);
    }

    fn set_indicator(&mut self, level: f32) {
        set_duty(INDICATOR_LEDC_CHANNEL, level_to_duty(level));
    }

    fn indicator_off(&mut self) {
        set_duty(INDICATOR_LEDC_CHANNEL, 0);
    }

    fn delay_ms(&mut self, ms: u32) {
        FreeRtos::delay_ms(ms);
    }

    fn now_ms(&mut self) -> u32 {
        let us = unsafe { sys::esp_timer_get_time() };
        (us / 1000) as u32
    }
}
