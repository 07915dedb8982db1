//! Software-rendered overlay using `minifb`.
//!
//! Layout:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │  stage: one dot per visible fingertip, labelled with     │
//! │  its note; a ring grows out of it when it fires          │
//! │                                                          │
//! ├─────┬─────┬─────┬─────┬─────┬─────┬─────┬─────┬─────┬────┤
//! │ A4  │ B4  │ C5  │ D5  │ E5  │ C4  │ D4  │ E4  │ F4  │ G4 │  keys
//! ├─────┴─────┴─────┴─────┴─────┴─────┴─────┴─────┴─────┴────┤
//! │  status bar / key legend                                 │
//! └──────────────────────────────────────────────────────────┘
//! ```

use std::sync::mpsc::Sender;
use std::time::Duration;

use minifb::{Key, KeyRepeat, Window, WindowOptions};

use finger_slots::{FingerSlot, SLOT_COUNT};

use crate::error::{PianoError, Result};
use crate::hands::SimInput;
use crate::session::Session;

// ════════════════════════════════════════════════════════════════════════════
// Layout constants
// ════════════════════════════════════════════════════════════════════════════

pub const WIN_W:     usize = 960;
pub const WIN_H:     usize = 620;
const STAGE_H:       usize = 480;
const KEYS_Y:        usize = STAGE_H;
const KEYS_H:        usize = 84;
const KEY_W:         usize = WIN_W / SLOT_COUNT;
const STATUS_Y:      usize = KEYS_Y + KEYS_H;
const DOT_R:         usize = 7;
const RING_GROWTH:   f32   = 18.0;
const BG_COLOR:      u32   = 0xFF1A1A2E;
const KEY_COLOR:     u32   = 0xFF16213E;
const TEXT_BG:       u32   = 0xFF0F3460;
const RING_COLOR:    u32   = 0xFFFFD700;  // gold

/// Simulation keys, slot 0 first.
const SIM_KEYS: [Key; SLOT_COUNT] = [
    Key::Key1, Key::Key2, Key::Key3, Key::Key4, Key::Key5,
    Key::Key6, Key::Key7, Key::Key8, Key::Key9, Key::Key0,
];

// ════════════════════════════════════════════════════════════════════════════
// Visualizer
// ════════════════════════════════════════════════════════════════════════════

pub struct Visualizer {
    window: Window,
    buf:    Vec<u32>,
    /// Present only when the keyboard drives a [`crate::hands::SimHandSource`].
    sim_tx: Option<Sender<SimInput>>,
    held:   [bool; SLOT_COUNT],
}

impl Visualizer {
    pub fn new(sim_tx: Option<Sender<SimInput>>) -> Result<Self> {
        let mut window = Window::new(
            "tap_piano",
            WIN_W, WIN_H,
            WindowOptions {
                resize: false,
                ..WindowOptions::default()
            },
        ).map_err(|e| PianoError::Window(e.to_string()))?;

        window.limit_update_rate(Some(Duration::from_millis(16))); // ~60fps

        Ok(Visualizer {
            window,
            buf: vec![BG_COLOR; WIN_W * WIN_H],
            sim_tx,
            held: [false; SLOT_COUNT],
        })
    }

    pub fn is_open(&self) -> bool { self.window.is_open() }

    /// Poll the keyboard.  Returns false when the user asked to quit.
    pub fn poll_input(&mut self) -> bool {
        if !self.window.is_open() { return false; }
        if self.window.is_key_pressed(Key::Escape, KeyRepeat::No) { return false; }

        if let Some(tx) = &self.sim_tx {
            for (slot, key) in FingerSlot::ALL.into_iter().zip(SIM_KEYS) {
                let down = self.window.is_key_down(key);
                if down == self.held[slot.index()] { continue; }
                self.held[slot.index()] = down;
                let input = if down { SimInput::FingerDown(slot) } else { SimInput::FingerUp(slot) };
                let _ = tx.send(input);
            }
        }
        true
    }

    /// Render one frame.
    pub fn render(&mut self, session: &Session, source_ended: bool) {
        self.buf.fill(BG_COLOR);

        // ── Fingertips ────────────────────────────────────────────────────
        let (fw, fh) = session.frame_size();
        for (slot, sample) in session.fingertips().iter() {
            let Some((x, y)) = sample.pixel().and_then(|p| to_stage(p, fw, fh)) else { continue };
            let color = slot_color(slot);
            let flash = session.flash(slot);

            if flash > 0.0 {
                let r = DOT_R as f32 + RING_GROWTH * (1.0 - flash);
                self.draw_ring(x, y, r as usize, blend(BG_COLOR, RING_COLOR, flash));
            }
            self.fill_circle(x, y, DOT_R, color);
            let note = session.notes().note(slot).to_string();
            self.draw_text(&note, x + DOT_R + 4, y.saturating_sub(5), 2, 0xFFEEEEEE);
        }

        // ── Key strip ─────────────────────────────────────────────────────
        for (slot, note) in session.notes().iter() {
            let x = slot.index() * KEY_W;
            let lit = session.flash(slot);
            let base = blend(KEY_COLOR, slot_color(slot), 0.25);
            self.fill_rect(x, KEYS_Y, KEY_W, KEYS_H, blend(base, slot_color(slot), lit));
            self.draw_border(x, KEYS_Y, KEY_W, KEYS_H, 0xFF000000);

            let label = note.to_string();
            let lx = x + KEY_W.saturating_sub(label.chars().count() * 8) / 2;
            self.draw_text(&label, lx, KEYS_Y + 24, 2, 0xFFEEEEEE);
            let key = if slot.index() == 9 { "0".to_string() } else { (slot.index() + 1).to_string() };
            self.draw_text(&key, x + 4, KEYS_Y + KEYS_H - 10, 1, 0xFF888888);
        }

        // ── Status bar ────────────────────────────────────────────────────
        self.fill_rect(0, STATUS_Y, WIN_W, WIN_H - STATUS_Y, TEXT_BG);
        self.draw_text(&session.status(), 10, STATUS_Y + 8, 2, 0xFFEEEEEE);

        // ── Key legend ────────────────────────────────────────────────────
        let legend = match (&self.sim_tx, source_ended) {
            (_, true)     => "source ended   Esc=quit",
            (Some(_), _)  => "hold 1-0 = lower a fingertip   Esc=quit",
            (None, false) => "Esc=quit",
        };
        self.draw_text(legend, 10, WIN_H - 14, 1, 0xFF888888);

        self.window.update_with_buffer(&self.buf, WIN_W, WIN_H).ok();
    }

    // ── Primitive drawing helpers ─────────────────────────────────────────

    fn fill_rect(&mut self, x: usize, y: usize, w: usize, h: usize, color: u32) {
        for row in y..(y+h).min(WIN_H) {
            for col in x..(x+w).min(WIN_W) {
                self.buf[row * WIN_W + col] = color;
            }
        }
    }

    fn draw_border(&mut self, x: usize, y: usize, w: usize, h: usize, color: u32) {
        if w == 0 || h == 0 { return; }
        for col in x..(x+w).min(WIN_W) {
            self.set_pixel(col, y, color);
            self.set_pixel(col, y + h - 1, color);
        }
        for row in y..(y+h).min(WIN_H) {
            self.set_pixel(x, row, color);
            self.set_pixel(x + w - 1, row, color);
        }
    }

    fn set_pixel(&mut self, x: usize, y: usize, color: u32) {
        if x < WIN_W && y < WIN_H {
            self.buf[y * WIN_W + x] = color;
        }
    }

    fn fill_circle(&mut self, cx: usize, cy: usize, r: usize, color: u32) {
        let r2 = (r * r) as isize;
        for dy in -(r as isize)..=r as isize {
            for dx in -(r as isize)..=r as isize {
                if dx*dx + dy*dy <= r2 {
                    self.plot(cx as isize + dx, cy as isize + dy, color);
                }
            }
        }
    }

    /// Two-pixel-thick circle outline.
    fn draw_ring(&mut self, cx: usize, cy: usize, r: usize, color: u32) {
        let outer = (r * r) as isize;
        let inner = (r.saturating_sub(2) * r.saturating_sub(2)) as isize;
        for dy in -(r as isize)..=r as isize {
            for dx in -(r as isize)..=r as isize {
                let d2 = dx*dx + dy*dy;
                if d2 <= outer && d2 > inner {
                    self.plot(cx as isize + dx, cy as isize + dy, color);
                }
            }
        }
    }

    fn plot(&mut self, x: isize, y: isize, color: u32) {
        if x >= 0 && y >= 0 && (y as usize) < STAGE_H {
            self.set_pixel(x as usize, y as usize, color);
        }
    }

    /// 3×5 bitmap font, each pixel drawn `scale`×`scale`.
    fn draw_text(&mut self, text: &str, x: usize, y: usize, scale: usize, color: u32) {
        let mut cx = x;
        for ch in text.chars() {
            let glyph = char_glyph(ch);
            for (row, &bits) in glyph.iter().enumerate() {
                for col in 0..3usize {
                    if bits & (1 << (2 - col)) != 0 {
                        self.fill_rect(cx + col * scale, y + row * scale, scale, scale, color);
                    }
                }
            }
            cx += 4 * scale; // 3 wide + 1 gap
            if cx + 4 * scale > WIN_W { break; }
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Geometry and color
// ────────────────────────────────────────────────────────────────────────────

/// Scale a pixel in a `fw`×`fh` detector frame onto the stage.
fn to_stage((x, y): (i32, i32), fw: u32, fh: u32) -> Option<(usize, usize)> {
    if fw == 0 || fh == 0 || x < 0 || y < 0 { return None; }
    let sx = x as u64 * WIN_W as u64 / fw as u64;
    let sy = y as u64 * STAGE_H as u64 / fh as u64;
    (sx < WIN_W as u64 && sy < STAGE_H as u64).then_some((sx as usize, sy as usize))
}

/// Ten evenly spaced hues, one per slot.
fn slot_color(slot: FingerSlot) -> u32 {
    let hue = slot.index() as f32 / SLOT_COUNT as f32 * 360.0;
    hsv_to_argb(hue, 0.75, 0.95)
}

/// Convert HSV → packed ARGB (0xAARRGGBB, A=0xFF).
fn hsv_to_argb(h: f32, s: f32, v: f32) -> u32 {
    let h  = h % 360.0;
    let hi = (h / 60.0) as u32;
    let f  = h / 60.0 - hi as f32;
    let p  = v * (1.0 - s);
    let q  = v * (1.0 - s * f);
    let t  = v * (1.0 - s * (1.0 - f));
    let (r, g, b) = match hi {
        0 => (v, t, p),
        1 => (q, v, p),
        2 => (p, v, t),
        3 => (p, q, v),
        4 => (t, p, v),
        _ => (v, p, q),
    };
    let ri = (r * 255.0) as u32;
    let gi = (g * 255.0) as u32;
    let bi = (b * 255.0) as u32;
    0xFF000000 | (ri << 16) | (gi << 8) | bi
}

/// Alpha-blend two ARGB colors. `t` = 0.0 → all `a`, `t` = 1.0 → all `b`.
fn blend(a: u32, b: u32, t: f32) -> u32 {
    let t = t.clamp(0.0, 1.0);
    let lerp = |ca: u32, cb: u32| (ca as f32 * (1.0-t) + cb as f32 * t).round() as u32;
    let ar = (a >> 16) & 0xFF; let br = (b >> 16) & 0xFF;
    let ag = (a >>  8) & 0xFF; let bg = (b >>  8) & 0xFF;
    let ab =  a        & 0xFF; let bb =  b        & 0xFF;
    0xFF000000 | (lerp(ar,br) << 16) | (lerp(ag,bg) << 8) | lerp(ab,bb)
}

fn char_glyph(c: char) -> [u8; 5] {
    match c {
        '0' => [0b111, 0b101, 0b101, 0b101, 0b111],
        '1' => [0b010, 0b110, 0b010, 0b010, 0b111],
        '2' => [0b111, 0b001, 0b111, 0b100, 0b111],
        '3' => [0b111, 0b001, 0b111, 0b001, 0b111],
        '4' => [0b101, 0b101, 0b111, 0b001, 0b001],
        '5' => [0b111, 0b100, 0b111, 0b001, 0b111],
        '6' => [0b111, 0b100, 0b111, 0b101, 0b111],
        '7' => [0b111, 0b001, 0b001, 0b001, 0b001],
        '8' => [0b111, 0b101, 0b111, 0b101, 0b111],
        '9' => [0b111, 0b101, 0b111, 0b001, 0b111],
        'a' | 'A' => [0b111, 0b101, 0b111, 0b101, 0b101],
        'b' => [0b100, 0b100, 0b110, 0b101, 0b110],   // flat
        'B' => [0b110, 0b101, 0b110, 0b101, 0b110],
        'c' | 'C' => [0b111, 0b100, 0b100, 0b100, 0b111],
        'd' | 'D' => [0b110, 0b101, 0b101, 0b101, 0b110],
        'e' | 'E' => [0b111, 0b100, 0b111, 0b100, 0b111],
        'f' | 'F' => [0b111, 0b100, 0b111, 0b100, 0b100],
        'g' | 'G' => [0b111, 0b100, 0b101, 0b101, 0b111],
        'h' | 'H' => [0b101, 0b101, 0b111, 0b101, 0b101],
        'i' | 'I' => [0b111, 0b010, 0b010, 0b010, 0b111],
        'j' | 'J' => [0b001, 0b001, 0b001, 0b101, 0b111],
        'k' | 'K' => [0b101, 0b101, 0b110, 0b101, 0b101],
        'l' | 'L' => [0b100, 0b100, 0b100, 0b100, 0b111],
        'm' | 'M' => [0b101, 0b111, 0b101, 0b101, 0b101],
        'n' | 'N' => [0b111, 0b101, 0b101, 0b101, 0b101],
        'o' | 'O' => [0b111, 0b101, 0b101, 0b101, 0b111],
        'p' | 'P' => [0b111, 0b101, 0b111, 0b100, 0b100],
        'q' | 'Q' => [0b111, 0b101, 0b101, 0b111, 0b001],
        'r' | 'R' => [0b110, 0b101, 0b110, 0b101, 0b101],
        's' | 'S' => [0b111, 0b100, 0b111, 0b001, 0b111],
        't' | 'T' => [0b111, 0b010, 0b010, 0b010, 0b010],
        'u' | 'U' => [0b101, 0b101, 0b101, 0b101, 0b111],
        'v' | 'V' => [0b101, 0b101, 0b101, 0b010, 0b010],
        'w' | 'W' => [0b101, 0b101, 0b101, 0b111, 0b101],
        'x' | 'X' => [0b101, 0b101, 0b010, 0b101, 0b101],
        'y' | 'Y' => [0b101, 0b101, 0b111, 0b010, 0b010],
        'z' | 'Z' => [0b111, 0b001, 0b010, 0b100, 0b111],
        '#' => [0b101, 0b111, 0b101, 0b111, 0b101],
        '<' => [0b001, 0b010, 0b100, 0b010, 0b001],
        '>' => [0b100, 0b010, 0b001, 0b010, 0b100],
        '/' => [0b001, 0b001, 0b010, 0b100, 0b100],
        '-' => [0b000, 0b000, 0b111, 0b000, 0b000],
        '.' => [0b000, 0b000, 0b000, 0b000, 0b010],
        ',' => [0b000, 0b000, 0b000, 0b010, 0b100],
        ':' => [0b000, 0b010, 0b000, 0b010, 0b000],
        '=' => [0b000, 0b111, 0b000, 0b111, 0b000],
        ' ' => [0b000, 0b000, 0b000, 0b000, 0b000],
        _   => [0b000, 0b000, 0b010, 0b000, 0b000], // fallback dot
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_scaling() {
        assert_eq!(to_stage((0, 0), 640, 480), Some((0, 0)));
        assert_eq!(to_stage((320, 240), 640, 480), Some((WIN_W / 2, STAGE_H / 2)));
        assert_eq!(to_stage((640, 0), 640, 480), None);
        assert_eq!(to_stage((-1, 10), 640, 480), None);
        assert_eq!(to_stage((10, 10), 0, 480), None);
    }

    #[test]
    fn slot_colors_are_distinct() {
        let mut colors: Vec<u32> = FingerSlot::ALL.iter().map(|&s| slot_color(s)).collect();
        colors.sort_unstable();
        colors.dedup();
        assert_eq!(colors.len(), SLOT_COUNT);
    }

    #[test]
    fn blend_endpoints() {
        assert_eq!(blend(0xFF102030, 0xFFF0E0D0, 0.0), 0xFF102030);
        assert_eq!(blend(0xFF102030, 0xFFF0E0D0, 1.0), 0xFFF0E0D0);
        assert_eq!(blend(0xFF000000, 0xFF0000FF, 2.0), 0xFF0000FF);
    }

    #[test]
    fn note_glyphs_exist() {
        let fallback = char_glyph('\u{2603}');
        for c in "ABCDEFG#b0123456789".chars() {
            assert_ne!(char_glyph(c), fallback, "{:?}", c);
        }
    }
}
