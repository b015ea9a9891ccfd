//! Command table and handlers

use embedded_hal::digital::v2::OutputPin;

use super::session::Session;
use crate::config::{DeviceInfo, PAGE_SIZE};
use crate::drivers::flash::{page_base, PageProgrammer, SelfProgram};
use crate::drivers::StatusLed;
use crate::protocol::{is_gated, Command, Packet, ProtocolError, Response, Result};

/// Dispatch order; the first entry with a matching code wins
pub static COMMAND_TABLE: [Command; 11] = [
    Command::Activate,
    Command::Deactivate,
    Command::GetVersion,
    Command::GetDeviceName,
    Command::GetModuleName,
    Command::GetBootSize,
    Command::GetFlashSize,
    Command::GetPageSize,
    Command::SetPageAddress,
    Command::ReadPage,
    Command::WritePage,
];

pub fn lookup(code: u8) -> Option<Command> {
    COMMAND_TABLE.iter().copied().find(|command| command.code() == code)
}

/// Everything a handler may read or change
pub struct Target<'a, F, P> {
    pub session: &'a mut Session,
    pub led: &'a mut StatusLed<P>,
    pub programmer: &'a mut PageProgrammer<F>,
    pub page_address: &'a mut u32,
    pub device: &'a DeviceInfo,
}

/// Run `packet` and leave the reply in `response`.
///
/// Failures, including gated and unknown commands, produce the error
/// response and leave the session alone.
pub fn dispatch<F, P>(
    target: &mut Target<'_, F, P>,
    packet: &Packet<'_>,
    response: &mut Response,
) -> Result<()>
where
    F: SelfProgram,
    P: OutputPin,
{
    response.begin(packet.command);

    let outcome = if is_gated(packet.command) && !target.session.active {
        Err(ProtocolError::Inactive)
    } else {
        match lookup(packet.command) {
            Some(command) => execute(command, target, packet, response),
            None => Err(ProtocolError::InvalidCommand),
        }
    };

    if outcome.is_err() {
        response.fail();
    }
    outcome
}

fn execute<F, P>(
    command: Command,
    target: &mut Target<'_, F, P>,
    packet: &Packet<'_>,
    response: &mut Response,
) -> Result<()>
where
    F: SelfProgram,
    P: OutputPin,
{
    match command {
        Command::Activate => activate(target),
        Command::Deactivate => deactivate(target),
        Command::GetVersion => response.push(target.device.version),
        Command::GetDeviceName => response.extend(target.device.device_name.as_bytes()),
        Command::GetModuleName => response.extend(target.device.module_name.as_bytes()),
        Command::GetBootSize => response.push_u16(target.device.boot_size),
        Command::GetFlashSize => response.push_u16(target.device.flash_size_kb),
        Command::GetPageSize => response.push_u16(target.device.page_size),
        Command::SetPageAddress => set_page_address(target, packet),
        Command::ReadPage => read_page(target, response),
        Command::WritePage => write_page(target, packet),
    }
}

fn activate<F, P: OutputPin>(target: &mut Target<'_, F, P>) -> Result<()> {
    target.session.activate();
    target.led.flash();
    Ok(())
}

fn deactivate<F, P: OutputPin>(target: &mut Target<'_, F, P>) -> Result<()> {
    target.session.deactivate();
    target.led.blink();
    Ok(())
}

fn set_page_address<F, P>(target: &mut Target<'_, F, P>, packet: &Packet<'_>) -> Result<()> {
    match packet.payload {
        [b0, b1, b2, b3, ..] => {
            *target.page_address = u32::from_be_bytes([*b0, *b1, *b2, *b3]);
            Ok(())
        }
        _ => Err(ProtocolError::InvalidPacket),
    }
}

fn read_page<F: SelfProgram, P>(target: &mut Target<'_, F, P>, response: &mut Response) -> Result<()> {
    let page = response.reserve(PAGE_SIZE)?;
    target.programmer.read(*target.page_address, page);
    Ok(())
}

fn write_page<F: SelfProgram, P>(target: &mut Target<'_, F, P>, packet: &Packet<'_>) -> Result<()> {
    // Never touch the section this code runs from
    if page_base(*target.page_address) >= target.device.boot_start() {
        return Err(ProtocolError::ProtectedRegion);
    }

    target.programmer.program(*target.page_address, packet.payload);
    Ok(())
}
