//! The square demo: move a colored square with WASD until `q` is pressed.

use std::{io, path::PathBuf};

use log::{debug, info};

use crate::{config::Config, dumper, surface::Surface, terminal::Console};

pub const HELP_TEXT: &str = "WASD TO MOVE, C TO CLEAR, P TO DUMP, Q TO QUIT";
const HELP_POSITION: (i32, i32) = (10, 10);
const DUMP_ROOT: &str = "framebuffer";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    Move { dx: i32, dy: i32 },
    ToggleClear,
    Dump,
    Quit,
    Idle,
}

impl Command {
    pub fn from_key(key: Option<u8>) -> Self {
        match key {
            Some(b'w') => Command::Move { dx: 0, dy: -1 },
            Some(b's') => Command::Move { dx: 0, dy: 1 },
            Some(b'a') => Command::Move { dx: -1, dy: 0 },
            Some(b'd') => Command::Move { dx: 1, dy: 0 },
            Some(b'c') => Command::ToggleClear,
            Some(b'p') => Command::Dump,
            Some(b'q') => Command::Quit,
            _ => Command::Idle,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Square {
    pub x: i32,
    pub y: i32,
    pub size: i32,
}

impl Square {
    /// Moves by `(dx, dy)` and keeps the whole square inside `width × height`.
    pub fn moved(self, dx: i32, dy: i32, width: usize, height: usize) -> Self {
        let max_x = saturating_i32(width).saturating_sub(self.size).max(0);
        let max_y = saturating_i32(height).saturating_sub(self.size).max(0);
        Self {
            x: self.x.saturating_add(dx).clamp(0, max_x),
            y: self.y.saturating_add(dy).clamp(0, max_y),
            ..self
        }
    }
}

fn saturating_i32<T: TryInto<i32>>(value: T) -> i32 {
    value.try_into().unwrap_or(i32::MAX)
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct Summary {
    pub frames: u64,
    pub dumps: Vec<PathBuf>,
}

pub struct Driver<'a> {
    config: &'a Config,
    square: Square,
    clearing: bool,
    summary: Summary,
}

impl<'a> Driver<'a> {
    /// Starts with the square centred on a `width × height` screen.
    pub fn new(config: &'a Config, width: usize, height: usize) -> Self {
        let size = saturating_i32(config.square_size);
        let square = Square {
            x: saturating_i32(width).saturating_sub(size) / 2,
            y: saturating_i32(height).saturating_sub(size) / 2,
            size,
        }
        .moved(0, 0, width, height);
        Self {
            config,
            square,
            clearing: false,
            summary: Summary::default(),
        }
    }

    pub fn square(&self) -> Square {
        self.square
    }

    pub fn is_clearing(&self) -> bool {
        self.clearing
    }

    /// Handles one command and renders one frame. Returns `false` once the
    /// driver should stop.
    pub fn step<B>(
        &mut self,
        command: Command,
        surface: &mut Surface<B>,
        console: &impl Console,
    ) -> io::Result<bool>
    where
        B: AsRef<[u8]> + AsMut<[u8]>,
    {
        match command {
            Command::Quit => return Ok(false),
            Command::Move { dx, dy } if !self.clearing => {
                self.erase(surface);
                let step = saturating_i32(self.config.step);
                self.square = self.square.moved(
                    dx.saturating_mul(step),
                    dy.saturating_mul(step),
                    surface.width(),
                    surface.height(),
                );
            }
            Command::ToggleClear => {
                self.clearing = !self.clearing;
                debug!("Clear mode {}", if self.clearing { "on" } else { "off" });
            }
            Command::Dump => {
                let path = dumper::dump(
                    &self.config.dump_directory,
                    DUMP_ROOT,
                    surface.visible_bytes(),
                )?;
                info!("Dumped framebuffer to {}", path.display());
                self.summary.dumps.push(path);
            }
            Command::Move { .. } | Command::Idle => {}
        }

        if self.clearing {
            console.clear_screen()?;
        } else {
            self.draw(surface);
        }
        self.summary.frames += 1;
        Ok(true)
    }

    /// Runs until `q` is read, one frame per key poll.
    pub fn run<B>(mut self, surface: &mut Surface<B>, console: &impl Console) -> io::Result<Summary>
    where
        B: AsRef<[u8]> + AsMut<[u8]>,
    {
        self.draw(surface);
        loop {
            let key = console.read_key(self.config.key_timeout())?;
            if !self.step(Command::from_key(key), surface, console)? {
                break;
            }
            console.sleep(self.config.frame_delay());
        }
        Ok(self.summary)
    }

    fn erase<B>(&self, surface: &mut Surface<B>)
    where
        B: AsRef<[u8]> + AsMut<[u8]>,
    {
        let Square { x, y, size } = self.square;
        surface.fill_rect(x, y, size, size, self.config.background);
    }

    fn draw<B>(&self, surface: &mut Surface<B>)
    where
        B: AsRef<[u8]> + AsMut<[u8]>,
    {
        let Square { x, y, size } = self.square;
        surface.fill_rect(x, y, size, size, self.config.square_color);
        let (text_x, text_y) = HELP_POSITION;
        surface.draw_text(text_x, text_y, HELP_TEXT, self.config.text_color);
    }
}

#[cfg(test)]
mod tests {
    use std::{fs, time::Duration};

    use super::*;
    use crate::{color::Color, terminal::MockConsole};

    const WIDTH: usize = 400;
    const HEIGHT: usize = 300;

    fn config() -> Config {
        Config {
            square_size: 20,
            step: 10,
            ..Config::default()
        }
    }

    fn surface() -> Surface<Vec<u8>> {
        Surface::in_memory(WIDTH, HEIGHT)
    }

    fn square_is_drawn(surface: &Surface<Vec<u8>>, square: Square, color: Color) -> bool {
        (square.y..square.y + square.size).all(|y| {
            (square.x..square.x + square.size).all(|x| surface.get_pixel(x, y) == Some(color))
        })
    }

    #[test]
    fn keys_map_to_commands() {
        assert_eq!(Command::from_key(Some(b'w')), Command::Move { dx: 0, dy: -1 });
        assert_eq!(Command::from_key(Some(b'd')), Command::Move { dx: 1, dy: 0 });
        assert_eq!(Command::from_key(Some(b'c')), Command::ToggleClear);
        assert_eq!(Command::from_key(Some(b'q')), Command::Quit);
        assert_eq!(Command::from_key(Some(b'x')), Command::Idle);
        assert_eq!(Command::from_key(None), Command::Idle);
    }

    #[test]
    fn square_never_leaves_the_screen() {
        let square = Square { x: 5, y: 5, size: 20 };
        assert_eq!(square.moved(-10, -10, 100, 80), Square { x: 0, y: 0, size: 20 });
        assert_eq!(square.moved(500, 500, 100, 80), Square { x: 80, y: 60, size: 20 });
    }

    #[test]
    fn oversized_square_and_step_saturate_instead_of_wrapping() {
        let config = Config {
            square_size: 2_147_483_648,
            step: u32::MAX,
            ..Config::default()
        };
        let mut surface = Surface::in_memory(100, 80);
        let console = MockConsole::new([]);
        let mut driver = Driver::new(&config, 100, 80);
        assert_eq!(driver.square(), Square { x: 0, y: 0, size: i32::MAX });

        driver
            .step(Command::Move { dx: 1, dy: 1 }, &mut surface, &console)
            .unwrap();
        assert_eq!(driver.square(), Square { x: 0, y: 0, size: i32::MAX });
        assert_eq!(surface.get_pixel(99, 79), Some(config.square_color));
    }

    #[test]
    fn huge_step_moves_to_the_edge_in_the_pressed_direction() {
        let config = Config {
            step: u32::MAX,
            ..config()
        };
        let mut surface = surface();
        let console = MockConsole::new([]);
        let mut driver = Driver::new(&config, WIDTH, HEIGHT);

        driver
            .step(Command::Move { dx: 1, dy: 0 }, &mut surface, &console)
            .unwrap();
        assert_eq!(driver.square().x, WIDTH as i32 - 20);
        driver
            .step(Command::Move { dx: 0, dy: -1 }, &mut surface, &console)
            .unwrap();
        assert_eq!(driver.square().y, 0);
    }

    #[test]
    fn driver_starts_centred() {
        let config = config();
        let driver = Driver::new(&config, WIDTH, HEIGHT);
        assert_eq!(driver.square(), Square { x: 190, y: 140, size: 20 });
    }

    #[test]
    fn moving_erases_the_old_square_and_draws_the_new_one() {
        let config = config();
        let mut surface = surface();
        let console = MockConsole::new([]);
        let mut driver = Driver::new(&config, WIDTH, HEIGHT);
        let before = driver.square();

        assert!(driver
            .step(Command::Move { dx: 1, dy: 0 }, &mut surface, &console)
            .unwrap());
        let after = driver.square();
        assert_eq!(after, Square { x: before.x + 10, ..before });
        assert!(square_is_drawn(&surface, after, config.square_color));
        // the strip uncovered by the move is background again
        assert!(square_is_drawn(
            &surface,
            Square { size: 10, ..before },
            config.background
        ));
    }

    #[test]
    fn run_stops_on_quit_and_paces_frames() {
        let config = config();
        let mut surface = surface();
        let console = MockConsole::from_script("dd.s.q");
        let summary = Driver::new(&config, WIDTH, HEIGHT)
            .run(&mut surface, &console)
            .unwrap();

        assert_eq!(summary.frames, 5);
        assert!(summary.dumps.is_empty());
        assert_eq!(console.slept(), 5 * config.frame_delay());
        assert!(square_is_drawn(
            &surface,
            Square { x: 210, y: 150, size: 20 },
            config.square_color
        ));
    }

    #[test]
    fn clear_mode_clears_every_frame_and_ignores_moves() {
        let config = config();
        let mut surface = surface();
        let console = MockConsole::from_script("cdd.cq");
        let mut driver = Driver::new(&config, WIDTH, HEIGHT);
        let start = driver.square();

        for expected_clearing in [true, true, true, true, false] {
            let key = console.read_key(Duration::ZERO).unwrap();
            assert!(driver
                .step(Command::from_key(key), &mut surface, &console)
                .unwrap());
            assert_eq!(driver.is_clearing(), expected_clearing);
        }
        assert_eq!(console.clears(), 4);
        assert_eq!(driver.square(), start);
    }

    #[test]
    fn help_text_is_drawn() {
        let config = config();
        let mut surface = surface();
        let console = MockConsole::new([]);
        let mut driver = Driver::new(&config, WIDTH, HEIGHT);
        driver.step(Command::Idle, &mut surface, &console).unwrap();

        let mut expected = Surface::in_memory(WIDTH, HEIGHT);
        expected.draw_text(10, 10, HELP_TEXT, config.text_color);
        let text_rows = 10..10 + crate::font::GLYPH_HEIGHT as i32;
        for y in text_rows {
            for x in 0..WIDTH as i32 {
                assert_eq!(surface.get_pixel(x, y), expected.get_pixel(x, y));
            }
        }
    }

    #[test]
    fn dump_key_writes_the_visible_framebuffer() {
        let directory =
            std::env::temp_dir().join(format!("fbtoys-square-dump-{}", std::process::id()));
        let config = Config {
            dump_directory: directory.clone(),
            ..config()
        };
        let mut surface = surface();
        let console = MockConsole::from_script("pq");
        let summary = Driver::new(&config, WIDTH, HEIGHT)
            .run(&mut surface, &console)
            .unwrap();

        assert_eq!(summary.dumps.len(), 1);
        let dumped = fs::read(&summary.dumps[0]).unwrap();
        assert_eq!(dumped.len(), WIDTH * HEIGHT * 2);
        assert_eq!(dumped, surface.visible_bytes());

        fs::remove_dir_all(directory).unwrap();
    }

    #[test]
    fn exhausted_key_source_is_an_error() {
        let config = config();
        let mut surface = surface();
        let console = MockConsole::from_script("..");
        let result = Driver::new(&config, WIDTH, HEIGHT).run(&mut surface, &console);
        assert_eq!(result.unwrap_err().kind(), io::ErrorKind::UnexpectedEof);
    }
}
