//! # Arm command line
//!
//! Operator console for the arm executable. Each line typed at the prompt is one command:
//!
//! - `mode <auto|manual>` - select the operating mode
//! - `cam <index>` - select the active camera, `-1` deselects all cameras
//! - `jog <F|B|R|L|U|D>` - send a single manual jog
//! - `watch [count]` - print the next `count` telemetry messages
//! - `exit` - leave the console

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use color_eyre::{eyre::WrapErr, Report};
use rustyline::{error::ReadlineError, DefaultEditor};
use std::iter;
use structopt::StructOpt;

use comms_if::{
    net::{zmq, MonitoredSocket, SocketOptions},
    tc::{ArmMode, CamSelect, ManualCmd, Tc, TcResponse},
    tm::{TmChannel, TmMessage},
};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

const PROMPT: &str = "Arm $ ";
const HISTORY_PATH: &str = "arm_cli_history.txt";

/// Time to wait for a reply or a telemetry message.
///
/// Units: milliseconds
const RECV_TIMEOUT_MS: i32 = 2000;

// ---------------------------------------------------------------------------
// STRUCTS
// ---------------------------------------------------------------------------

/// Operator console for the arm executable.
#[derive(Debug, StructOpt)]
#[structopt(name = "arm_cli")]
struct Opt {
    /// Telecommand endpoint of the arm executable
    #[structopt(long, default_value = "tcp://localhost:5021")]
    tc: String,

    /// Telemetry endpoint of the arm executable
    #[structopt(long, default_value = "tcp://localhost:5020")]
    tm: String,
}

// ---------------------------------------------------------------------------
// ENUMS
// ---------------------------------------------------------------------------

/// A console command.
#[derive(Debug, StructOpt)]
#[structopt(name = "arm")]
enum Command {
    /// Select the operating mode
    #[structopt(name = "mode")]
    Mode {
        /// Either "auto" or "manual"
        #[structopt(parse(try_from_str = parse_mode))]
        mode: ArmMode
    },

    /// Select the active camera
    #[structopt(name = "cam")]
    Cam {
        /// Camera index, -1 to deselect all cameras
        #[structopt(allow_hyphen_values = true, parse(try_from_str = parse_cam))]
        select: CamSelect
    },

    /// Send a single manual jog
    #[structopt(name = "jog")]
    Jog {
        /// One of F, B, R, L, U, D
        #[structopt(parse(try_from_str = parse_jog))]
        cmd: ManualCmd
    },

    /// Print the next telemetry messages
    #[structopt(name = "watch")]
    Watch {
        #[structopt(default_value = "8")]
        count: usize
    },

    /// Leave the console
    #[structopt(name = "exit")]
    Exit,
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

fn main() -> Result<(), Report> {
    color_eyre::install()?;

    let opt = Opt::from_args();

    let ctx = zmq::Context::new();

    let tc_socket = MonitoredSocket::new(
        &ctx,
        zmq::REQ,
        SocketOptions {
            block_on_first_connect: false,
            req_correlate: true,
            req_relaxed: true,
            recv_timeout: RECV_TIMEOUT_MS,
            linger: 1,
            ..Default::default()
        },
        &opt.tc
    ).wrap_err("Could not connect to the telecommand endpoint")?;

    let mut rl = DefaultEditor::new()
        .wrap_err("Could not start the line editor")?;
    if rl.load_history(HISTORY_PATH).is_err() {
        println!("No history detected");
    }

    loop {
        let line = match rl.readline(PROMPT) {
            Ok(l) => l,
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => {
                println!("Unhandled Error: {:?}", e);
                break
            }
        };

        if line.trim().is_empty() {
            continue;
        }
        rl.add_history_entry(line.as_str()).ok();

        let cmd = match Command::from_iter_safe(iter::once("arm").chain(line.split_whitespace())) {
            Ok(c) => c,
            Err(e) => {
                println!("{}", e);
                continue
            }
        };

        let tc = match cmd {
            Command::Mode { mode } => Tc::SetMode(mode),
            Command::Cam { select } => Tc::SelectCamera(select),
            Command::Jog { cmd } => Tc::Manual(cmd),
            Command::Watch { count } => {
                if let Err(e) = watch(&ctx, &opt.tm, count) {
                    println!("Could not watch telemetry: {:?}", e);
                }
                continue
            },
            Command::Exit => break
        };

        match send_tc(&tc_socket, &tc) {
            Ok(TcResponse::Ok) => println!("OK"),
            Ok(TcResponse::Invalid) => println!("Rejected: {}", tc.to_wire()),
            Err(e) => println!("{:?}", e)
        }
    }

    rl.save_history(HISTORY_PATH)
        .wrap_err("Could not save the command history")?;

    Ok(())
}

/// Send a telecommand and wait for the response.
fn send_tc(socket: &MonitoredSocket, tc: &Tc) -> Result<TcResponse, Report> {
    socket.send(&tc.to_wire(), 0)
        .wrap_err("Could not send the telecommand")?;

    let reply = socket.recv_string(0)
        .wrap_err("No response from the arm")?
        .map_err(|_| color_eyre::eyre::eyre!("Response was not valid UTF-8"))?;

    serde_json::from_str(&reply)
        .wrap_err_with(|| format!("Could not parse the response {:?}", reply))
}

/// Print `count` telemetry messages.
///
/// Camera images are summarised by their length.
fn watch(ctx: &zmq::Context, endpoint: &str, count: usize) -> Result<(), Report> {
    let socket = MonitoredSocket::new(
        ctx,
        zmq::SUB,
        SocketOptions {
            block_on_first_connect: false,
            recv_timeout: RECV_TIMEOUT_MS,
            linger: 1,
            ..Default::default()
        },
        endpoint
    ).wrap_err("Could not connect to the telemetry endpoint")?;

    socket.set_subscribe(b"")
        .wrap_err("Could not subscribe to telemetry")?;

    for _ in 0..count {
        let raw = socket.recv_string(0)
            .wrap_err("No telemetry received")?;

        match raw.as_deref().map(TmMessage::from_wire) {
            Ok(Ok(msg)) if msg.channel == TmChannel::CamImage => {
                println!("{:?}: <{} bytes>", msg.channel, msg.content.len())
            },
            Ok(Ok(msg)) => println!("{:?}: {:?}", msg.channel, msg.content),
            Ok(Err(e)) => println!("{}", e),
            Err(_) => println!("<non UTF-8 message>")
        }
    }

    Ok(())
}

fn parse_mode(s: &str) -> Result<ArmMode, String> {
    match s {
        "auto" => Ok(ArmMode::Auto),
        "manual" => Ok(ArmMode::Manual),
        _ => Err(format!("expected \"auto\" or \"manual\", found {:?}", s))
    }
}

fn parse_cam(s: &str) -> Result<CamSelect, String> {
    CamSelect::from_wire(s).map_err(|e| e.to_string())
}

fn parse_jog(s: &str) -> Result<ManualCmd, String> {
    let mut chars = s.chars();
    match (chars.next().and_then(ManualCmd::from_char), chars.next()) {
        (Some(c), None) => Ok(c),
        _ => Err(format!("expected one of F, B, R, L, U, D, found {:?}", s))
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    fn parse_line(line: &str) -> Option<Command> {
        Command::from_iter_safe(iter::once("arm").chain(line.split_whitespace())).ok()
    }

    #[test]
    fn test_parse_commands() {
        match parse_line("mode auto") {
            Some(Command::Mode { mode: ArmMode::Auto }) => (),
            c => panic!("Unexpected {:?}", c)
        }
        match parse_line("cam -1") {
            Some(Command::Cam { select: CamSelect::None }) => (),
            c => panic!("Unexpected {:?}", c)
        }
        match parse_line("cam 2") {
            Some(Command::Cam { select: CamSelect::Index(2) }) => (),
            c => panic!("Unexpected {:?}", c)
        }
        match parse_line("jog U") {
            Some(Command::Jog { cmd: ManualCmd::Up }) => (),
            c => panic!("Unexpected {:?}", c)
        }
        match parse_line("watch") {
            Some(Command::Watch { count: 8 }) => (),
            c => panic!("Unexpected {:?}", c)
        }
    }

    #[test]
    fn test_parse_invalid() {
        assert!(parse_line("mode fast").is_none());
        assert!(parse_line("jog UD").is_none());
        assert!(parse_line("cam two").is_none());
        assert!(parse_line("fly").is_none());
    }
}
