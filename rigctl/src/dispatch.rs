//! Command table and dispatch
//!
//! Commands are whitespace separated tokens: a short letter (`F`) or a long
//! name (`set_freq`, optionally written `\set_freq`) followed by its
//! arguments. Several commands may share one line.

use std::fmt::Write as _;
use std::io::{self, Write};
use std::time::Duration;

use rig_backends::ModelRegistry;
use rig_core::{CacheSelector, Rig};
use rig_protocol::caps::Parity;
use rig_protocol::{
    Freq, Func, Level, Mode, Offset, Op, Parm, Ptt, RigCaps, RigError, Split, Value, Vfo, Width,
};

/// One entry of the command table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandDef {
    pub short: Option<char>,
    pub long: &'static str,
    pub args: &'static [&'static str],
}

const fn def(short: Option<char>, long: &'static str, args: &'static [&'static str]) -> CommandDef {
    CommandDef { short, long, args }
}

pub const COMMANDS: &[CommandDef] = &[
    def(Some('F'), "set_freq", &["Frequency"]),
    def(Some('f'), "get_freq", &[]),
    def(Some('M'), "set_mode", &["Mode", "Passband"]),
    def(Some('m'), "get_mode", &[]),
    def(Some('V'), "set_vfo", &["VFO"]),
    def(Some('v'), "get_vfo", &[]),
    def(Some('T'), "set_ptt", &["PTT"]),
    def(Some('t'), "get_ptt", &[]),
    def(Some('S'), "set_split_vfo", &["Split", "TX VFO"]),
    def(Some('s'), "get_split_vfo", &[]),
    def(Some('I'), "set_split_freq", &["TX Frequency"]),
    def(Some('i'), "get_split_freq", &[]),
    def(Some('X'), "set_split_mode", &["TX Mode", "TX Passband"]),
    def(Some('x'), "get_split_mode", &[]),
    def(Some('L'), "set_level", &["Level", "Level Value"]),
    def(Some('l'), "get_level", &["Level"]),
    def(Some('U'), "set_func", &["Func", "Func Status"]),
    def(Some('u'), "get_func", &["Func"]),
    def(Some('P'), "set_parm", &["Parm", "Parm Value"]),
    def(Some('p'), "get_parm", &["Parm"]),
    def(Some('J'), "set_rit", &["RIT"]),
    def(Some('j'), "get_rit", &[]),
    def(Some('Z'), "set_xit", &["XIT"]),
    def(Some('z'), "get_xit", &[]),
    def(Some('_'), "get_info", &[]),
    def(Some('*'), "reset", &[]),
    def(Some('1'), "dump_caps", &[]),
    def(Some('C'), "set_cache_timeout", &["Kind", "Milliseconds"]),
    def(None, "set_conf", &["Token", "Value"]),
    def(None, "get_conf", &["Token"]),
    def(Some('q'), "quit", &[]),
];

/// Find a command by short letter or long name
pub fn lookup(token: &str) -> Option<&'static CommandDef> {
    let name = token.strip_prefix('\\').unwrap_or(token);
    let mut chars = name.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        if let Some(d) = COMMANDS.iter().find(|d| d.short == Some(c)) {
            return Some(d);
        }
    }
    COMMANDS.iter().find(|d| d.long == name)
}

/// A parsed command
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    SetFreq(Freq),
    GetFreq,
    SetMode(Mode, Width),
    GetMode,
    SetVfo(Vfo),
    GetVfo,
    SetPtt(Ptt),
    GetPtt,
    SetSplitVfo(Split, Vfo),
    GetSplitVfo,
    SetSplitFreq(Freq),
    GetSplitFreq,
    SetSplitMode(Mode, Width),
    GetSplitMode,
    SetLevel(Level, Value),
    GetLevel(Level),
    SetFunc(Func, bool),
    GetFunc(Func),
    SetParm(Parm, Value),
    GetParm(Parm),
    SetRit(Offset),
    GetRit,
    SetXit(Offset),
    GetXit,
    GetInfo,
    Reset,
    DumpCaps,
    SetCacheTimeout(CacheSelector, Duration),
    SetConf(String, String),
    GetConf(String),
    Quit,
}

fn invalid(what: &str, s: &str) -> RigError {
    RigError::InvalidParam(format!("bad {} '{}'", what, s))
}

fn parse_freq(s: &str) -> Result<Freq, RigError> {
    if let Ok(hz) = s.parse::<Freq>() {
        return Ok(hz);
    }
    // rigctl has always accepted "14074000.0" and "1.4074e7"
    match s.parse::<f64>() {
        Ok(f) if f.is_finite() && f >= 0.0 => Ok(f.round() as Freq),
        _ => Err(invalid("frequency", s)),
    }
}

fn parse_offset(s: &str) -> Result<Offset, RigError> {
    s.parse().map_err(|_| invalid("offset", s))
}

fn parse_flag(what: &str, s: &str) -> Result<bool, RigError> {
    match s {
        "0" => Ok(false),
        "1" => Ok(true),
        _ => Err(invalid(what, s)),
    }
}

impl Request {
    fn from_args(def: &CommandDef, args: &[&str]) -> Result<Self, RigError> {
        let request = match def.long {
            "set_freq" => Request::SetFreq(parse_freq(args[0])?),
            "get_freq" => Request::GetFreq,
            "set_mode" => Request::SetMode(
                args[0].parse()?,
                args[1].parse().map_err(|_| invalid("passband", args[1]))?,
            ),
            "get_mode" => Request::GetMode,
            "set_vfo" => Request::SetVfo(args[0].parse()?),
            "get_vfo" => Request::GetVfo,
            "set_ptt" => Request::SetPtt(Ptt::from(parse_flag("PTT", args[0])?)),
            "get_ptt" => Request::GetPtt,
            "set_split_vfo" => {
                Request::SetSplitVfo(Split::from(parse_flag("split", args[0])?), args[1].parse()?)
            }
            "get_split_vfo" => Request::GetSplitVfo,
            "set_split_freq" => Request::SetSplitFreq(parse_freq(args[0])?),
            "get_split_freq" => Request::GetSplitFreq,
            "set_split_mode" => Request::SetSplitMode(
                args[0].parse()?,
                args[1].parse().map_err(|_| invalid("passband", args[1]))?,
            ),
            "get_split_mode" => Request::GetSplitMode,
            "set_level" => {
                let level: Level = args[0].parse()?;
                Request::SetLevel(level, level.parse_value(args[1])?)
            }
            "get_level" => Request::GetLevel(args[0].parse()?),
            "set_func" => Request::SetFunc(args[0].parse()?, parse_flag("status", args[1])?),
            "get_func" => Request::GetFunc(args[0].parse()?),
            "set_parm" => {
                let parm: Parm = args[0].parse()?;
                Request::SetParm(parm, parm.parse_value(args[1])?)
            }
            "get_parm" => Request::GetParm(args[0].parse()?),
            "set_rit" => Request::SetRit(parse_offset(args[0])?),
            "get_rit" => Request::GetRit,
            "set_xit" => Request::SetXit(parse_offset(args[0])?),
            "get_xit" => Request::GetXit,
            "get_info" => Request::GetInfo,
            "reset" => Request::Reset,
            "dump_caps" => Request::DumpCaps,
            "set_cache_timeout" => Request::SetCacheTimeout(
                args[0].parse()?,
                Duration::from_millis(
                    args[1]
                        .parse()
                        .map_err(|_| invalid("milliseconds", args[1]))?,
                ),
            ),
            "set_conf" => Request::SetConf(args[0].to_string(), args[1].to_string()),
            "get_conf" => Request::GetConf(args[0].to_string()),
            "quit" => Request::Quit,
            other => return Err(RigError::Internal(format!("no parser for '{}'", other))),
        };
        Ok(request)
    }
}

/// A command with the table entry it came from
#[derive(Debug, Clone, PartialEq)]
pub struct Parsed {
    pub def: &'static CommandDef,
    pub request: Request,
}

/// Parse every command in a token stream
pub fn parse<'a>(tokens: impl IntoIterator<Item = &'a str>) -> Result<Vec<Parsed>, RigError> {
    let mut tokens = tokens.into_iter();
    let mut out = Vec::new();
    while let Some(token) = tokens.next() {
        let def =
            lookup(token).ok_or_else(|| RigError::InvalidParam(format!("unknown command '{}'", token)))?;
        let args: Vec<&str> = tokens.by_ref().take(def.args.len()).collect();
        if args.len() < def.args.len() {
            return Err(RigError::InvalidParam(format!(
                "{} needs {}",
                def.long,
                def.args.join(", ")
            )));
        }
        out.push(Parsed {
            def,
            request: Request::from_args(def, &args)?,
        });
    }
    Ok(out)
}

/// Run one request; returns the lines a get prints
pub fn execute(rig: &mut Rig, request: &Request) -> Result<Vec<String>, RigError> {
    let lines = match request {
        Request::SetFreq(hz) => {
            rig.set_freq(Vfo::Current, *hz)?;
            vec![]
        }
        Request::GetFreq => vec![rig.get_freq(Vfo::Current)?.to_string()],
        Request::SetMode(mode, width) => {
            rig.set_mode(Vfo::Current, *mode, *width)?;
            vec![]
        }
        Request::GetMode => {
            let (mode, width) = rig.get_mode(Vfo::Current)?;
            vec![mode.to_string(), width.to_string()]
        }
        Request::SetVfo(vfo) => {
            rig.set_vfo(*vfo)?;
            vec![]
        }
        Request::GetVfo => vec![rig.get_vfo()?.to_string()],
        Request::SetPtt(ptt) => {
            rig.set_ptt(Vfo::Current, *ptt)?;
            vec![]
        }
        Request::GetPtt => vec![u8::from(rig.get_ptt(Vfo::Current)?.is_on()).to_string()],
        Request::SetSplitVfo(split, tx_vfo) => {
            rig.set_split_vfo(Vfo::Current, *split, *tx_vfo)?;
            vec![]
        }
        Request::GetSplitVfo => {
            let (split, tx_vfo) = rig.get_split_vfo(Vfo::Current)?;
            vec![u8::from(split.is_on()).to_string(), tx_vfo.to_string()]
        }
        Request::SetSplitFreq(hz) => {
            rig.set_split_freq(Vfo::Current, *hz)?;
            vec![]
        }
        Request::GetSplitFreq => vec![rig.get_split_freq(Vfo::Current)?.to_string()],
        Request::SetSplitMode(mode, width) => {
            rig.set_split_mode(Vfo::Current, *mode, *width)?;
            vec![]
        }
        Request::GetSplitMode => {
            let (mode, width) = rig.get_split_mode(Vfo::Current)?;
            vec![mode.to_string(), width.to_string()]
        }
        Request::SetLevel(level, value) => {
            rig.set_level(Vfo::Current, *level, *value)?;
            vec![]
        }
        Request::GetLevel(level) => vec![rig.get_level(Vfo::Current, *level)?.to_string()],
        Request::SetFunc(func, on) => {
            rig.set_func(Vfo::Current, *func, *on)?;
            vec![]
        }
        Request::GetFunc(func) => {
            vec![u8::from(rig.get_func(Vfo::Current, *func)?).to_string()]
        }
        Request::SetParm(parm, value) => {
            rig.set_parm(*parm, *value)?;
            vec![]
        }
        Request::GetParm(parm) => vec![rig.get_parm(*parm)?.to_string()],
        Request::SetRit(offset) => {
            rig.set_rit(Vfo::Current, *offset)?;
            vec![]
        }
        Request::GetRit => vec![rig.get_rit(Vfo::Current)?.to_string()],
        Request::SetXit(offset) => {
            rig.set_xit(Vfo::Current, *offset)?;
            vec![]
        }
        Request::GetXit => vec![rig.get_xit(Vfo::Current)?.to_string()],
        Request::GetInfo => vec![rig.get_info()?],
        Request::Reset => {
            rig.reset()?;
            vec![]
        }
        Request::DumpCaps => dump_caps(rig.caps()),
        Request::SetCacheTimeout(selector, ttl) => {
            rig.set_cache_timeout(*selector, *ttl);
            vec![]
        }
        Request::SetConf(token, value) => {
            rig.set_conf(token, value)?;
            vec![]
        }
        Request::GetConf(token) => vec![rig.get_conf(token)?],
        Request::Quit => vec![],
    };
    Ok(lines)
}

fn join<T: ToString>(items: &[T]) -> String {
    if items.is_empty() {
        return "None".into();
    }
    items
        .iter()
        .map(|i| i.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

fn power(mw: Option<u32>) -> String {
    mw.map_or_else(|| "-".into(), |mw| format!("{}W", f64::from(mw) / 1000.0))
}

/// Human-readable capability table
pub fn dump_caps(caps: &RigCaps) -> Vec<String> {
    let mut out = vec![
        format!("Caps dump for model: {}", caps.model),
        format!("Model name: {}", caps.model_name),
        format!("Mfg name: {}", caps.manufacturer),
        format!("Backend version: {}", caps.version),
        format!("Backend status: {:?}", caps.status),
        format!("Rig type: {:?}", caps.rig_type),
        format!("Port type: {:?}", caps.port.port_type),
    ];
    let port = &caps.port;
    if port.serial_rate_max > 0 {
        out.push(format!(
            "Serial speed: {}..{} baud, {}{}{}, ctrl={:?}",
            port.serial_rate_min,
            port.serial_rate_max,
            port.data_bits,
            match port.parity {
                Parity::None => 'N',
                Parity::Odd => 'O',
                Parity::Even => 'E',
            },
            port.stop_bits,
            port.handshake,
        ));
    }
    out.push(format!(
        "Write delay: {}ms, timeout {}ms, {} retry",
        port.write_delay_ms, port.timeout_ms, port.retry
    ));
    out.push(format!("Post write delay: {}ms", port.post_write_delay_ms));
    out.push(format!("Mode list: {}", join(caps.modes)));
    out.push(format!("VFO list: {}", join(caps.vfos)));
    out.push(format!(
        "Targetable: freq={} mode={}",
        if caps.targetable.freq { "Y" } else { "N" },
        if caps.targetable.mode { "Y" } else { "N" },
    ));
    out.push(format!("Get level: {}", join(caps.get_levels)));
    out.push(format!("Set level: {}", join(caps.set_levels)));
    for (level, gran) in caps.level_gran {
        out.push(format!(
            "Level {}: {}..{}/{}",
            level, gran.min, gran.max, gran.step
        ));
    }
    out.push(format!(
        "Get functions: {}",
        join(&caps.get_funcs.iter().collect::<Vec<_>>())
    ));
    out.push(format!(
        "Set functions: {}",
        join(&caps.set_funcs.iter().collect::<Vec<_>>())
    ));
    out.push(format!(
        "Get parameters: {}",
        join(&caps.get_parms.iter().collect::<Vec<_>>())
    ));
    out.push(format!(
        "Set parameters: {}",
        join(&caps.set_parms.iter().collect::<Vec<_>>())
    ));
    out.push(format!("Max RIT: -{0}..+{0} Hz", caps.max_rit));
    out.push(format!("Max XIT: -{0}..+{0} Hz", caps.max_xit));
    out.push(format!("Preamp: {}", join(caps.preamp)));
    out.push(format!("Attenuator: {}", join(caps.attenuator)));

    out.push("RX ranges:".into());
    for r in caps.rx_ranges {
        out.push(format!("  {} Hz - {} Hz: {}", r.start, r.end, join(r.modes)));
    }
    out.push("TX ranges:".into());
    for r in caps.tx_ranges {
        out.push(format!(
            "  {} Hz - {} Hz: {} ({} - {})",
            r.start,
            r.end,
            join(r.modes),
            power(r.low_power_mw),
            power(r.high_power_mw)
        ));
    }
    out.push("Tuning steps:".into());
    for s in caps.tuning_steps {
        out.push(format!("  {} Hz: {}", s.step, join(s.modes)));
    }
    out.push("Filters:".into());
    for f in caps.filters {
        out.push(format!("  {} Hz: {}", f.width, join(f.modes)));
    }
    out.push("Channels:".into());
    for c in caps.channels {
        out.push(format!("  {}..{}: {:?}", c.start, c.end, c.kind));
    }

    let mut has = String::new();
    for op in Op::ALL {
        let _ = write!(has, "{}: {}  ", op, if caps.has_op(*op) { "Y" } else { "N" });
    }
    out.push(has.trim_end().to_string());
    out
}

/// Print the models a registry knows
pub fn list_models(registry: &ModelRegistry, out: &mut dyn Write) -> io::Result<()> {
    writeln!(
        out,
        "{:>6}  {:<14} {:<24} {:<14} {}",
        "Rig #", "Mfg", "Model", "Version", "Status"
    )?;
    for entry in registry.list() {
        let caps = entry.caps;
        writeln!(
            out,
            "{:>6}  {:<14} {:<24} {:<14} {:?}",
            caps.model, caps.manufacturer, caps.model_name, caps.version, caps.status
        )?;
    }
    Ok(())
}

/// How results are written back
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyStyle {
    /// Values only; errors as text with their code
    Plain,
    /// Values followed by `RPRT 0`, errors as `RPRT -<code>`
    Report,
}

/// What the caller should do after a line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    /// A command failed
    Failed,
    Quit,
}

fn write_error(out: &mut dyn Write, style: ReplyStyle, name: &str, e: &RigError) -> io::Result<()> {
    match style {
        ReplyStyle::Plain => writeln!(out, "{}: error {}: {}", name, e.code(), e),
        ReplyStyle::Report => writeln!(out, "RPRT -{}", e.code()),
    }
}

/// Parse and run one line of commands against a session
///
/// `run` gets exclusive access to the rig for one request at a time. Commands
/// after a failing one on the same line are skipped.
pub fn run_line<F>(line: &str, style: ReplyStyle, out: &mut dyn Write, mut run: F) -> io::Result<Flow>
where
    F: FnMut(&Request) -> Result<Vec<String>, RigError>,
{
    let parsed = match parse(line.split_whitespace()) {
        Ok(parsed) => parsed,
        Err(e) => {
            write_error(out, style, "parse", &e)?;
            return Ok(Flow::Failed);
        }
    };
    for Parsed { def, request } in parsed {
        if request == Request::Quit {
            return Ok(Flow::Quit);
        }
        match run(&request) {
            Ok(lines) => {
                for l in &lines {
                    writeln!(out, "{}", l)?;
                }
                if style == ReplyStyle::Report && lines.is_empty() {
                    writeln!(out, "RPRT 0")?;
                }
            }
            Err(e) => {
                tracing::debug!("{} failed: {}", def.long, e);
                write_error(out, style, def.long, &e)?;
                return Ok(Flow::Failed);
            }
        }
    }
    out.flush()?;
    Ok(Flow::Continue)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rig_backends::Dummy;
    use rig_core::{CacheKind, NullTransport};

    fn dummy() -> Rig {
        let mut rig = Rig::new(Box::new(Dummy::new()));
        rig.open(Box::new(NullTransport)).unwrap();
        rig
    }

    fn run(rig: &mut Rig, line: &str, style: ReplyStyle) -> (Flow, String) {
        let mut out = Vec::new();
        let flow = run_line(line, style, &mut out, |r| execute(rig, r)).unwrap();
        (flow, String::from_utf8(out).unwrap())
    }

    #[test]
    fn test_lookup_short_and_long() {
        assert_eq!(lookup("F").unwrap().long, "set_freq");
        assert_eq!(lookup("set_freq").unwrap().long, "set_freq");
        assert_eq!(lookup("\\get_level").unwrap().short, Some('l'));
        assert_eq!(lookup("1").unwrap().long, "dump_caps");
        assert_eq!(lookup("Z").unwrap().long, "set_xit");
        assert!(lookup("Y").is_none());
        assert!(lookup("set_frequency").is_none());
    }

    #[test]
    fn test_table_is_unambiguous() {
        for (i, a) in COMMANDS.iter().enumerate() {
            for b in &COMMANDS[i + 1..] {
                assert_ne!(a.long, b.long);
                if a.short.is_some() {
                    assert_ne!(a.short, b.short);
                }
            }
        }
    }

    #[test]
    fn test_parse_several_commands() {
        let parsed = parse("F 14074000 M USB 2400 l AF".split_whitespace()).unwrap();
        let requests: Vec<_> = parsed.into_iter().map(|p| p.request).collect();
        assert_eq!(
            requests,
            vec![
                Request::SetFreq(14_074_000),
                Request::SetMode(Mode::Usb, 2400),
                Request::GetLevel(Level::Af),
            ]
        );
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            parse(["F"]),
            Err(RigError::InvalidParam(_))
        ));
        assert!(parse(["F", "abc"]).is_err());
        assert!(parse(["T", "2"]).is_err());
        assert!(parse(["M", "XYZ", "0"]).is_err());
        assert!(parse(["C", "nonsense", "10"]).is_err());
        assert!(parse(["what"]).is_err());
    }

    #[test]
    fn test_parse_float_frequency() {
        let parsed = parse(["F", "1.4074e7"]).unwrap();
        assert_eq!(parsed[0].request, Request::SetFreq(14_074_000));
        let parsed = parse(["C", "all", "0"]).unwrap();
        assert_eq!(
            parsed[0].request,
            Request::SetCacheTimeout(CacheSelector::All, Duration::ZERO)
        );
        let parsed = parse(["C", "freq", "250"]).unwrap();
        assert_eq!(
            parsed[0].request,
            Request::SetCacheTimeout(
                CacheSelector::Kind(CacheKind::Freq),
                Duration::from_millis(250)
            )
        );
    }

    #[test]
    fn test_plain_session() {
        let mut rig = dummy();
        let (flow, out) = run(&mut rig, "F 7074000 f M USB 2400 m", ReplyStyle::Plain);
        assert_eq!(flow, Flow::Continue);
        assert_eq!(out, "7074000\nUSB\n2400\n");

        let (_, out) = run(&mut rig, "V VFOB v f", ReplyStyle::Plain);
        assert_eq!(out, "VFOB\n146000000\n");

        let (_, out) = run(&mut rig, "T 1 t S 1 VFOA s", ReplyStyle::Plain);
        assert_eq!(out, "1\n1\nVFOA\n");
    }

    #[test]
    fn test_levels_and_info() {
        let mut rig = dummy();
        let (_, out) = run(&mut rig, "L AF 0.25 l AF l KEYSPD", ReplyStyle::Plain);
        assert_eq!(out, "0.250000\n20\n");
        let (_, out) = run(&mut rig, "_", ReplyStyle::Plain);
        assert_eq!(out, "Nothing much (dummy)\n");
    }

    #[test]
    fn test_split_commands() {
        let mut rig = dummy();
        let (_, out) = run(&mut rig, "I 14080000 i X USB 0 x", ReplyStyle::Plain);
        assert_eq!(out, "14080000\nUSB\n2400\n");
        let (_, out) = run(&mut rig, "f", ReplyStyle::Plain);
        assert_eq!(out, "145000000\n");
    }

    #[test]
    fn test_func_parm_and_offsets() {
        let mut rig = dummy();
        let (_, out) = run(&mut rig, "U NB 1 u NB u LOCK", ReplyStyle::Plain);
        assert_eq!(out, "1\n0\n");
        let (_, out) = run(&mut rig, "P BACKLIGHT 0.25 p BACKLIGHT p APO", ReplyStyle::Plain);
        assert_eq!(out, "0.250000\n0\n");
        let (_, out) = run(&mut rig, "J -500 j Z 200 z", ReplyStyle::Plain);
        assert_eq!(out, "-500\n200\n");

        let (flow, out) = run(&mut rig, "J 20000", ReplyStyle::Report);
        assert_eq!(flow, Flow::Failed);
        assert!(out.starts_with("RPRT -"), "{}", out);
        assert!(parse(["U", "NB", "on"]).is_err());
        assert!(parse(["P", "APO", "1.5"]).is_err());
        assert!(parse(["u", "WOBBLE"]).is_err());
    }

    #[test]
    fn test_error_stops_the_line() {
        let mut rig = dummy();
        let (flow, out) = run(&mut rig, "F 999999999999 f", ReplyStyle::Plain);
        assert_eq!(flow, Flow::Failed);
        assert!(out.starts_with("set_freq: error 17: "), "{}", out);
        assert_eq!(out.lines().count(), 1);

        let (flow, out) = run(&mut rig, "L STRENGTH 3", ReplyStyle::Plain);
        assert_eq!(flow, Flow::Failed);
        assert!(out.starts_with("set_level: error "), "{}", out);
    }

    #[test]
    fn test_report_style() {
        let mut rig = dummy();
        let (_, out) = run(&mut rig, "F 14074000 f", ReplyStyle::Report);
        assert_eq!(out, "RPRT 0\n14074000\n");
        let (_, out) = run(&mut rig, "T 7", ReplyStyle::Report);
        assert_eq!(out, "RPRT -1\n");
    }

    #[test]
    fn test_quit_and_conf() {
        let mut rig = dummy();
        let (flow, out) = run(&mut rig, "set_conf retry 7 get_conf retry q f", ReplyStyle::Plain);
        assert_eq!(flow, Flow::Quit);
        assert_eq!(out, "7\n");
    }

    #[test]
    fn test_dump_caps() {
        let mut rig = dummy();
        let (_, out) = run(&mut rig, "1", ReplyStyle::Plain);
        assert!(out.starts_with("Caps dump for model: 1\nModel name: Dummy\n"));
        assert!(out.contains("Mode list: AM CW"));
        assert!(out.contains("get_freq: Y"));
        assert!(out.contains("Set parameters: BACKLIGHT BEEP APO TIME\n"));
        assert!(out.contains("Max RIT: -9990..+9990 Hz"));
    }

    #[test]
    fn test_list_models() {
        let mut out = Vec::new();
        list_models(&ModelRegistry::with_builtin(), &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.lines().count(), 6);
        assert!(text.contains("TS-480"));
        assert!(text.contains("TT-588 Omni VII"));
    }

    proptest! {
        #[test]
        fn prop_set_then_get_freq(hz in 150_000u64..60_000_000) {
            let mut rig = dummy();
            let (_, out) = run(&mut rig, &format!("F {} f", hz), ReplyStyle::Plain);
            prop_assert_eq!(out, format!("{}\n", hz));
        }

        #[test]
        fn prop_garbage_never_panics(line in "[ -~]{0,40}") {
            let mut rig = dummy();
            let _ = run(&mut rig, &line, ReplyStyle::Report);
        }
    }
}
