use crate::error::{BvhError, Result};
use crate::types::*;
use log::{debug, trace, warn};
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;

///////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

static RE_JOINT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(ROOT|JOINT)\s+(\w+)").expect("joint regex is valid"));

// leading zero and exponent are optional: `-.5`, `1e-3`, `12.`
static RE_OFFSET: LazyLock<Regex> = LazyLock::new(|| {
    let num = r"([-+]?(?:\d+\.?\d*|\.\d+)(?:[eE][-+]?\d+)?)";
    Regex::new(&format!(r"^OFFSET\s+{num}\s+{num}\s+{num}\s*$")).expect("offset regex is valid")
});

static RE_CHANNELS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^CHANNELS\s+(\d+)\s*(.*)$").expect("channels regex is valid"));

///////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

/// State of one hierarchy parse. Every parse owns its own table, and a joint's index is the
/// table length at the moment the joint is created, so parents are always numbered first.
struct HierarchyParser<'a, S: AsRef<str>> {
    lines: &'a [S],
    joints: Vec<Joint>,
}

impl<'a, S: AsRef<str>> HierarchyParser<'a, S> {
    fn new(lines: &'a [S]) -> Self {
        HierarchyParser {
            lines,
            joints: Vec::new(),
        }
    }

    fn line(&self, pos: usize) -> Result<&'a str> {
        self.lines
            .get(pos)
            .map(|line| line.as_ref().trim())
            .ok_or_else(|| BvhError::parse(pos, "", "unexpected end of document inside HIERARCHY"))
    }

    fn expect_open_brace(&self, pos: usize) -> Result<()> {
        let line = self.line(pos)?;
        if line == "{" {
            Ok(())
        } else {
            Err(BvhError::parse(pos, line, "expected `{`"))
        }
    }

    fn parse_offset(&self, pos: usize) -> Result<Position> {
        let line = self.line(pos)?;
        let captures = RE_OFFSET
            .captures(line)
            .ok_or_else(|| BvhError::parse(pos, line, "expected `OFFSET x y z`"))?;
        let mut xyz = [0.0; 3];
        for (i, value) in xyz.iter_mut().enumerate() {
            *value = captures[i + 1]
                .parse::<f64>()
                .map_err(|e| BvhError::parse(pos, line, format!("bad offset value: {e}")))?;
        }
        Ok(Position::new(xyz[0], xyz[1], xyz[2]))
    }

    fn parse_channels(&self, pos: usize) -> Result<Vec<Channel>> {
        let line = self.line(pos)?;
        let captures = RE_CHANNELS
            .captures(line)
            .ok_or_else(|| BvhError::parse(pos, line, "expected `CHANNELS n ...`"))?;
        let num_channels = captures[1]
            .parse::<usize>()
            .map_err(|e| BvhError::parse(pos, line, format!("bad channel count: {e}")))?;
        let channels = captures[2]
            .split_whitespace()
            .map(|name| name.parse::<Channel>())
            .collect::<std::result::Result<Vec<Channel>, String>>()
            .map_err(|e| BvhError::parse(pos, line, e))?;
        if channels.len() != num_channels {
            return Err(BvhError::parse(
                pos,
                line,
                format!("declared {num_channels} channels but listed {}", channels.len()),
            ));
        }

        //// rotation triplets are always decoded as X, Y, Z
        let rotations: Vec<Channel> = channels.iter().copied().filter(Channel::is_rotation).collect();
        if rotations != [Channel::Xrotation, Channel::Yrotation, Channel::Zrotation] {
            let listed: Vec<String> = rotations.iter().map(Channel::to_string).collect();
            return Err(BvhError::parse(
                pos,
                line,
                format!(
                    "rotation channels must be `Xrotation Yrotation Zrotation`, found `{}`",
                    listed.join(" ")
                ),
            ));
        }
        Ok(channels)
    }

    /// Parse the block starting at `pos` and return the position right after its closing brace.
    fn parse_block(&mut self, pos: usize, parent_index: ParentIndex, depth: Depth) -> Result<usize> {
        let header = self.line(pos)?;
        let tokens: Vec<&str> = header.split_whitespace().collect();
        let kind = match tokens.as_slice() {
            ["End", "Site"] => "End Site",
            [first, ..] => *first,
            [] => "",
        };
        let is_top_level = parent_index == ROOT_PARENT;

        match kind {
            "ROOT" if is_top_level => self.parse_joint(pos, parent_index, depth),
            "JOINT" if !is_top_level => self.parse_joint(pos, parent_index, depth),
            "End Site" if !is_top_level => self.parse_endsite(pos, parent_index),
            "ROOT" => Err(BvhError::parse(pos, header, "only one ROOT is allowed per document")),
            "JOINT" | "End Site" => Err(BvhError::parse(pos, header, "expected ROOT")),
            _ => Err(BvhError::parse(pos, header, "expected ROOT, JOINT or End Site")),
        }
    }

    fn parse_joint(&mut self, pos: usize, parent_index: ParentIndex, depth: Depth) -> Result<usize> {
        let header = self.line(pos)?;
        let name = RE_JOINT
            .captures(header)
            .map(|captures| captures[2].to_string())
            .ok_or_else(|| BvhError::parse(pos, header, "joint name was not found"))?;

        self.expect_open_brace(pos + 1)?;
        let offset = self.parse_offset(pos + 2)?;
        let channels = self.parse_channels(pos + 3)?;

        //// index is assigned before any child is visited
        let index: Index = self.joints.len();
        trace!("joint {index} `{name}` parent={parent_index} depth={depth}");
        self.joints.push(Joint {
            name,
            index,
            parent_index,
            depth,
            offset,
            channels,
            children: Vec::new(),
            is_leaf: false,
            endsite: None,
        });
        if parent_index != ROOT_PARENT {
            self.joints[parent_index as Index].children.push(index);
        }

        //// recurse into children until the closing brace of this block
        let mut pos = pos + 4;
        while !self.line(pos)?.contains('}') {
            pos = self.parse_block(pos, index as ParentIndex, depth + 1)?;
        }
        Ok(pos + 1)
    }

    fn parse_endsite(&mut self, pos: usize, parent_index: ParentIndex) -> Result<usize> {
        self.expect_open_brace(pos + 1)?;
        let offset = self.parse_offset(pos + 2)?;
        let closing = self.line(pos + 3)?;
        if !closing.contains('}') {
            return Err(BvhError::parse(pos + 3, closing, "expected `}` closing End Site"));
        }

        let joint = &mut self.joints[parent_index as Index];
        if joint.endsite.is_some() {
            warn!(
                "joint `{}` has more than one End Site, keeping the first (line {})",
                joint.name,
                pos + 1
            );
        } else {
            joint.endsite = Some(Endsite { offset });
            joint.is_leaf = true;
        }
        Ok(pos + 4)
    }
}

///////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

/// Parse the `HIERARCHY` section into a joint table.
///
/// The first line must contain `HIERARCHY` and the `ROOT` block must start on the second line.
/// Inside a block the lines are at fixed positions: `{`, `OFFSET`, `CHANNELS` (named joints
/// only), then child blocks and the closing `}`.
/// `End Site` blocks don't become joints; their offset is stored on the enclosing joint.
pub fn parse_hierarchy<S: AsRef<str>>(lines: &[S]) -> Result<Skeleton> {
    let first = lines.first().map(|line| line.as_ref()).unwrap_or_default();
    if !first.contains("HIERARCHY") {
        return Err(BvhError::parse(0, first, "first line must be HIERARCHY"));
    }

    let mut parser = HierarchyParser::new(lines);
    parser.parse_block(1, ROOT_PARENT, 0)?;

    debug!("parsed hierarchy with {} joints", parser.joints.len());
    Ok(Skeleton {
        joints: parser.joints,
    })
}

/// Parse the `MOTION` section into a dense frame x channel matrix.
///
/// Rows are read from the line after `Frame Time:` up to the first empty line or end of input.
pub fn load_motion<S: AsRef<str>>(lines: &[S]) -> Result<MotionData> {
    let marker = lines
        .iter()
        .position(|line| line.as_ref().trim().starts_with("Frame Time"))
        .ok_or_else(|| {
            BvhError::parse(lines.len().saturating_sub(1), "", "missing `Frame Time:` line")
        })?;

    //// Parse frame time
    let frame_time_line = lines[marker].as_ref();
    let frame_time = frame_time_line
        .split_once(':')
        .map(|(_, value)| value.trim())
        .ok_or_else(|| BvhError::parse(marker, frame_time_line, "expected `Frame Time: <seconds>`"))?
        .parse::<f64>()
        .map_err(|e| BvhError::parse(marker, frame_time_line, format!("bad frame time: {e}")))?;

    //// Parse number of frames, if declared
    let mut declared_frames = None;
    for (pos, line) in lines[..marker].iter().enumerate() {
        let line = line.as_ref().trim();
        if let Some(value) = line.strip_prefix("Frames:") {
            let value = value
                .trim()
                .parse::<usize>()
                .map_err(|e| BvhError::parse(pos, line, format!("bad frame count: {e}")))?;
            declared_frames = Some(value);
        }
    }

    //// Parse motion rows
    let mut rows: Vec<Vec<f64>> = Vec::new();
    for (pos, line) in lines.iter().enumerate().skip(marker + 1) {
        let line = line.as_ref().trim();
        if line.is_empty() {
            break;
        }
        let row = line
            .split_whitespace()
            .map(|s| s.parse::<f64>())
            .collect::<std::result::Result<Vec<f64>, _>>()
            .map_err(|e| BvhError::parse(pos, line, format!("bad motion value: {e}")))?;
        if let Some(first) = rows.first() {
            if first.len() != row.len() {
                return Err(BvhError::parse(
                    pos,
                    line,
                    format!("motion row has {} values, expected {}", row.len(), first.len()),
                ));
            }
        }
        rows.push(row);
    }

    if let Some(declared) = declared_frames {
        if declared != rows.len() {
            warn!("`Frames: {declared}` but {} motion rows were read", rows.len());
        }
    }
    debug!(
        "loaded {} frames x {} channels, frame time {frame_time}",
        rows.len(),
        rows.first().map_or(0, Vec::len)
    );

    Ok(MotionData {
        frame_time,
        declared_frames,
        rows,
    })
}

//////////////////////////////////////////////////////////////// PUBLIC ///////////////////////////////////////////////////////////////////////

/// load a bvh file from a file path
pub fn load_bvh_from_file<P: AsRef<Path>>(file_path: P) -> Result<Bvh> {
    let contents = std::fs::read_to_string(file_path)?;
    load_bvh_from_string(&contents)
}

/// load a bvh file from a string
pub fn load_bvh_from_string(bvh_string: &str) -> Result<Bvh> {
    let lines: Vec<&str> = bvh_string.lines().collect();
    let skeleton = parse_hierarchy(&lines)?;
    let motion = load_motion(&lines)?;

    let declared = skeleton.num_channels();
    if motion.num_frames() > 0 && declared != motion.num_channels() {
        warn!(
            "CHANNELS lines declare {declared} channels but motion rows have {}",
            motion.num_channels()
        );
    }
    Ok(Bvh { skeleton, motion })
}

///////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
