use super::is_implemented;
use crate::context::RunContext;
use crate::ASCOMResult;

/// How completely a mode's members are implemented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeState {
    /// None of the members exist.
    Absent,
    /// Some members exist and some do not.
    Partial,
    /// Every member exists.
    Full,
}

/// Members of one mode of a mode group, and whether each is implemented.
///
/// For example the camera Gain group has a `Value` mode (`GainMin`, `GainMax`)
/// and an `Index` mode (`Gains`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModeProbe {
    /// Mode name.
    pub name: &'static str,
    members: Vec<(&'static str, bool)>,
}

impl ModeProbe {
    /// An empty probe for the named mode.
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            members: Vec::new(),
        }
    }

    /// Add a member, judging implementation from the result of reading it.
    #[must_use]
    pub fn member<T>(mut self, name: &'static str, result: &ASCOMResult<T>) -> Self {
        self.members.push((name, is_implemented(result)));
        self
    }

    /// Implementation state across the members.
    pub fn state(&self) -> ModeState {
        let implemented = self.members.iter().filter(|&&(_, present)| present).count();
        match implemented {
            0 => ModeState::Absent,
            n if n == self.members.len() => ModeState::Full,
            _ => ModeState::Partial,
        }
    }

    fn list(&self, present: bool) -> String {
        self.members
            .iter()
            .filter(|&&(_, member_present)| member_present == present)
            .map(|&(name, _)| name)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Check that at most one mode of a group is implemented, and only completely.
///
/// Any partially implemented mode, or more than one fully implemented mode, is
/// an Issue. Returns the name of the single fully implemented mode, if there is
/// exactly one and nothing is partial.
pub fn check_modes(
    ctx: &mut RunContext,
    group: &str,
    probes: &[ModeProbe],
) -> Option<&'static str> {
    let mut consistent = true;

    for probe in probes {
        if probe.state() == ModeState::Partial {
            consistent = false;
            ctx.issue(
                group,
                format!(
                    "{} mode is only partially implemented: {} implemented but {} not",
                    probe.name,
                    probe.list(true),
                    probe.list(false)
                ),
            );
        }
    }

    let full: Vec<_> = probes
        .iter()
        .filter(|probe| probe.state() == ModeState::Full)
        .map(|probe| probe.name)
        .collect();

    match (full.as_slice(), consistent) {
        ([], true) => {
            ctx.ok(group, format!("{group} is not implemented in any mode"));
            None
        }
        (&[mode], true) => {
            ctx.ok(group, format!("{group} is implemented in {mode} mode"));
            Some(mode)
        }
        ([_, _, ..], _) => {
            ctx.issue(
                group,
                format!(
                    "{group} must be implemented in exactly one mode but {} are implemented",
                    full.join(" and ")
                ),
            );
            None
        }
        (_, false) => None,
    }
}
