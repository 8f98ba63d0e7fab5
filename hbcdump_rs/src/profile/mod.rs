//! Profile analyzer.
//!
//! Aggregates a basic-block profile trace against a loaded module and renders
//! frequency tables, hot blocks, the page-level IO working set and per-function
//! info documents. Table lookups (strings, filenames, epilogue) work without a
//! profile; everything derived from hit counts reports
//! [`InspectError::NoProfile`] when none was loaded.

pub mod trace;

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::io::Write;

use serde::Serialize;

pub use trace::{BlockRecord, BlockRef, ProfileError, ProfileTrace};

use crate::bytecode::BytecodeModule;
use crate::bytecode::opcodes::{self, Instruction};
use crate::error::{InspectError, InspectResult};
use crate::sourcemap::SourceMap;

/// Page granularity used for the IO working set.
pub const PAGE_SIZE: usize = 4096;

/// Number of rows shown by the hot block table.
pub const TOP_BLOCKS: usize = 20;

const PAGES_PER_MAP_LINE: usize = 64;

/// Boundary the command dispatcher uses to reach the profile analyzer.
pub trait Analysis {
    /// Executed instructions per function, hottest first.
    fn dump_function_stats(&self, out: &mut dyn Write) -> InspectResult;

    /// Ids of every function with at least one executed block, one per line.
    fn dump_used_function_ids(&self, out: &mut dyn Write) -> InspectResult;

    fn dump_function_basic_block_stat(&self, id: u32, out: &mut dyn Write) -> InspectResult;

    /// Executed count per opcode, most frequent first.
    fn dump_instruction_stats(&self, out: &mut dyn Write) -> InspectResult;

    fn dump_io(&self, out: &mut dyn Write) -> InspectResult;

    fn dump_basic_block_stats(&self, out: &mut dyn Write) -> InspectResult;

    fn dump_string(&self, id: u32, out: &mut dyn Write) -> InspectResult;

    fn dump_file_name(&self, id: u32, out: &mut dyn Write) -> InspectResult;

    /// Pretty JSON document describing one function.
    fn dump_function_info(&self, id: u32, out: &mut dyn Write) -> InspectResult;

    fn dump_all_function_info(&self, out: &mut dyn Write) -> InspectResult;

    fn dump_summary(&self, out: &mut dyn Write) -> InspectResult;

    fn function_from_virtual_offset(&self, virtual_offset: u32) -> Option<u32>;

    fn dump_epilogue(&self, out: &mut dyn Write) -> InspectResult;
}

/// Aggregated statistics of one basic block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockStat {
    pub function: u32,
    /// Function-relative start offset.
    pub start: u32,
    /// Exclusive end: next block start or function end.
    pub end: u32,
    pub count: u64,
    pub instructions: u32,
}

impl BlockStat {
    pub fn executed(&self) -> u64 {
        self.count.saturating_mul(u64::from(self.instructions))
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FunctionInfo<'a> {
    function_id: u32,
    name: &'a str,
    virtual_offset: u32,
    file_offset: usize,
    size: u32,
    param_count: u32,
    instruction_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    source: Option<SourceInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    executed_instructions: Option<u64>,
}

#[derive(Debug, Serialize)]
struct SourceInfo {
    file: String,
    line: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    column: Option<u32>,
}

struct Profiled {
    trace: ProfileTrace,
    /// Sorted by (function, start).
    blocks: Vec<BlockStat>,
}

pub struct ProfileAnalyzer<'m> {
    module: &'m BytecodeModule,
    /// Decoded instructions per function, indexed by id.
    instructions: Vec<Vec<Instruction>>,
    profile: Option<Profiled>,
    source_map: Option<SourceMap>,
}

impl<'m> ProfileAnalyzer<'m> {
    pub fn new(
        module: &'m BytecodeModule,
        profile: Option<ProfileTrace>,
        source_map: Option<SourceMap>,
    ) -> Self {
        let instructions: Vec<Vec<Instruction>> = (0..module.function_count())
            .map(|id| {
                opcodes::decode(module.function_body(id).unwrap_or_default())
                    .map_while(Result::ok)
                    .collect()
            })
            .collect();
        let profile = profile.map(|trace| {
            let blocks = aggregate_blocks(module, &instructions, &trace);
            tracing::debug!(blocks = blocks.len(), "aggregated profile blocks");
            Profiled { trace, blocks }
        });
        Self {
            module,
            instructions,
            profile,
            source_map,
        }
    }

    fn profiled(&self) -> Result<&Profiled, InspectError> {
        self.profile.as_ref().ok_or(InspectError::NoProfile)
    }

    fn check_function(&self, id: u32) -> Result<(), InspectError> {
        if id < self.module.function_count() {
            Ok(())
        } else {
            Err(InspectError::NoSuchFunction(id))
        }
    }

    /// Executed instruction totals per function id.
    fn executed_per_function(profiled: &Profiled) -> BTreeMap<u32, u64> {
        let mut totals = BTreeMap::new();
        for block in &profiled.blocks {
            let total = totals.entry(block.function).or_insert(0u64);
            *total = total.saturating_add(block.executed());
        }
        totals
    }

    fn total_executed(profiled: &Profiled) -> u64 {
        saturating_sum(profiled.blocks.iter().map(BlockStat::executed))
    }

    fn source_of(&self, id: u32) -> Option<SourceInfo> {
        let func = self.module.function(id)?;
        if let Some(map) = &self.source_map {
            return map
                .lookup_virtual_offset(func.offset)
                .map(|loc| SourceInfo {
                    file: loc.file,
                    line: loc.line,
                    column: Some(loc.column),
                });
        }
        self.module
            .function_source(id)
            .map(|(file, line)| SourceInfo {
                file: file.to_string(),
                line,
                column: None,
            })
    }

    fn describe_function(&self, id: u32) -> String {
        let name = self.module.function_name(id);
        match self.source_of(id) {
            Some(src) => format!("{name} ({}:{})", src.file, src.line),
            None => name.to_string(),
        }
    }

    fn function_info(&self, id: u32) -> Option<FunctionInfo<'_>> {
        let func = self.module.function(id)?;
        let executed = self.profile.as_ref().map(|p| {
            saturating_sum(
                p.blocks
                    .iter()
                    .filter(|b| b.function == id)
                    .map(BlockStat::executed),
            )
        });
        Some(FunctionInfo {
            function_id: id,
            name: self.module.function_name(id),
            virtual_offset: func.offset,
            file_offset: self.module.bytecode_offset() + func.offset as usize,
            size: func.size,
            param_count: func.param_count,
            instruction_count: self.instructions.get(id as usize).map_or(0, Vec::len),
            source: self.source_of(id),
            executed_instructions: executed,
        })
    }
}

/// Counters saturate at `u64::MAX` instead of wrapping.
fn saturating_sum(values: impl Iterator<Item = u64>) -> u64 {
    values.fold(0, u64::saturating_add)
}

fn aggregate_blocks(
    module: &BytecodeModule,
    instructions: &[Vec<Instruction>],
    trace: &ProfileTrace,
) -> Vec<BlockStat> {
    let mut counts: BTreeMap<(u32, u32), u64> = BTreeMap::new();
    for record in &trace.blocks {
        let count = counts.entry((record.function, record.offset)).or_insert(0);
        *count = count.saturating_add(record.count);
    }

    let mut starts: HashMap<u32, Vec<u32>> = HashMap::new();
    for &(function, offset) in counts.keys() {
        starts.entry(function).or_default().push(offset);
    }

    counts
        .iter()
        .filter_map(|(&(function, start), &count)| {
            let func = module.function(function)?;
            let end = starts
                .get(&function)
                .and_then(|offsets| offsets.iter().copied().find(|&o| o > start))
                .unwrap_or(func.size);
            let body = instructions.get(function as usize)?;
            let in_block = body
                .iter()
                .filter(|inst| (start..end).contains(&inst.offset))
                .count() as u32;
            Some(BlockStat {
                function,
                start,
                end,
                count,
                instructions: in_block,
            })
        })
        .collect()
}

fn percent(part: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 * 100.0 / total as f64
    }
}

impl Analysis for ProfileAnalyzer<'_> {
    fn dump_function_stats(&self, out: &mut dyn Write) -> InspectResult {
        let profiled = self.profiled()?;
        let total = Self::total_executed(profiled);
        let mut rows: Vec<(u32, u64)> = Self::executed_per_function(profiled)
            .into_iter()
            .filter(|&(_, executed)| executed > 0)
            .collect();
        rows.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

        writeln!(out, "Function stats ({total} instructions executed):")?;
        writeln!(out, "{:>8} {:>12} {:>8}  Function", "Id", "Executed", "Share")?;
        for (id, executed) in rows {
            writeln!(
                out,
                "{:>8} {:>12} {:>7.2}%  {}",
                format!("#{id}"),
                executed,
                percent(executed, total),
                self.describe_function(id)
            )?;
        }
        Ok(())
    }

    fn dump_used_function_ids(&self, out: &mut dyn Write) -> InspectResult {
        let profiled = self.profiled()?;
        let used: BTreeSet<u32> = profiled
            .blocks
            .iter()
            .filter(|b| b.count > 0)
            .map(|b| b.function)
            .collect();
        for id in used {
            writeln!(out, "{id}")?;
        }
        Ok(())
    }

    fn dump_function_basic_block_stat(&self, id: u32, out: &mut dyn Write) -> InspectResult {
        self.check_function(id)?;
        let profiled = self.profiled()?;
        writeln!(out, "Basic blocks of {}#{id}:", self.describe_function(id))?;
        writeln!(
            out,
            "{:>15} {:>10} {:>6} {:>10}",
            "Range", "Hits", "Insts", "Executed"
        )?;
        for block in profiled.blocks.iter().filter(|b| b.function == id) {
            writeln!(
                out,
                "  {:#06x}-{:#06x} {:>10} {:>6} {:>10}",
                block.start,
                block.end,
                block.count,
                block.instructions,
                block.executed()
            )?;
        }
        Ok(())
    }

    fn dump_instruction_stats(&self, out: &mut dyn Write) -> InspectResult {
        let profiled = self.profiled()?;
        let total = Self::total_executed(profiled);
        let mut per_opcode: BTreeMap<&'static str, u64> = BTreeMap::new();
        for block in &profiled.blocks {
            let Some(body) = self.instructions.get(block.function as usize) else {
                continue;
            };
            for inst in body
                .iter()
                .filter(|inst| (block.start..block.end).contains(&inst.offset))
            {
                let count = per_opcode.entry(inst.opcode.name()).or_insert(0u64);
                *count = count.saturating_add(block.count);
            }
        }
        let mut rows: Vec<(&str, u64)> = per_opcode.into_iter().collect();
        rows.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));

        writeln!(out, "Instruction stats ({total} instructions executed):")?;
        for (name, count) in rows {
            writeln!(
                out,
                "  {name:<18}{count:>12} {:>7.2}%",
                percent(count, total)
            )?;
        }
        Ok(())
    }

    fn dump_io(&self, out: &mut dyn Write) -> InspectResult {
        let profiled = self.profiled()?;
        let base = self.module.bytecode_offset();
        let page_count = self.module.file_size().div_ceil(PAGE_SIZE).max(1);

        let mut touched = BTreeSet::new();
        let mut first_touch = Vec::new();
        for entry in &profiled.trace.trace {
            let Some(func) = self.module.function(entry.function) else {
                continue;
            };
            let page = (base + func.offset as usize + entry.offset as usize) / PAGE_SIZE;
            if touched.insert(page) {
                first_touch.push(page);
            }
        }

        writeln!(out, "IO working set ({PAGE_SIZE}-byte pages):")?;
        writeln!(
            out,
            "  Pages touched: {} of {} ({:.2}%)",
            touched.len(),
            page_count,
            percent(touched.len() as u64, page_count as u64)
        )?;
        let order: Vec<String> = first_touch.iter().map(usize::to_string).collect();
        writeln!(out, "  First-touch order: {}", order.join(" "))?;
        writeln!(out, "  Page map:")?;
        for line_start in (0..page_count).step_by(PAGES_PER_MAP_LINE) {
            let line_end = (line_start + PAGES_PER_MAP_LINE).min(page_count);
            let cells: String = (line_start..line_end)
                .map(|page| if touched.contains(&page) { '#' } else { '.' })
                .collect();
            writeln!(out, "    {:08x}  {cells}", line_start * PAGE_SIZE)?;
        }
        Ok(())
    }

    fn dump_basic_block_stats(&self, out: &mut dyn Write) -> InspectResult {
        let profiled = self.profiled()?;
        let total = Self::total_executed(profiled);
        let mut hot: Vec<&BlockStat> = profiled.blocks.iter().filter(|b| b.count > 0).collect();
        hot.sort_by(|a, b| {
            b.executed()
                .cmp(&a.executed())
                .then(a.function.cmp(&b.function))
                .then(a.start.cmp(&b.start))
        });

        writeln!(out, "Top {TOP_BLOCKS} hot basic blocks:")?;
        for block in hot.into_iter().take(TOP_BLOCKS) {
            writeln!(
                out,
                "  {:>12} {:>7.2}%  {}#{} [{:#06x}, {:#06x})",
                block.executed(),
                percent(block.executed(), total),
                self.module.function_name(block.function),
                block.function,
                block.start,
                block.end
            )?;
        }
        Ok(())
    }

    fn dump_string(&self, id: u32, out: &mut dyn Write) -> InspectResult {
        let text = self.module.string(id).ok_or(InspectError::NoSuchString(id))?;
        writeln!(out, "{text}")?;
        Ok(())
    }

    fn dump_file_name(&self, id: u32, out: &mut dyn Write) -> InspectResult {
        let name = self
            .module
            .filename(id)
            .ok_or(InspectError::NoSuchFilename(id))?;
        writeln!(out, "{name}")?;
        Ok(())
    }

    fn dump_function_info(&self, id: u32, out: &mut dyn Write) -> InspectResult {
        let info = self
            .function_info(id)
            .ok_or(InspectError::NoSuchFunction(id))?;
        serde_json::to_writer_pretty(&mut *out, &info).map_err(std::io::Error::from)?;
        writeln!(out)?;
        Ok(())
    }

    fn dump_all_function_info(&self, out: &mut dyn Write) -> InspectResult {
        let infos: Vec<FunctionInfo<'_>> = (0..self.module.function_count())
            .filter_map(|id| self.function_info(id))
            .collect();
        serde_json::to_writer_pretty(&mut *out, &infos).map_err(std::io::Error::from)?;
        writeln!(out)?;
        Ok(())
    }

    fn dump_summary(&self, out: &mut dyn Write) -> InspectResult {
        let m = self.module;
        writeln!(out, "Summary:")?;
        writeln!(out, "  File size: {} bytes", m.file_size())?;
        writeln!(out, "  Functions: {}", m.function_count())?;
        writeln!(out, "  Strings: {}", m.string_count())?;
        writeln!(out, "  Filenames: {}", m.filename_count())?;
        writeln!(out, "  Bytecode: {} bytes", m.bytecode().len())?;
        writeln!(
            out,
            "  Instructions: {}",
            self.instructions.iter().map(Vec::len).sum::<usize>()
        )?;
        writeln!(out, "  Epilogue: {} bytes", m.epilogue().len())?;
        if let Some(profiled) = &self.profile {
            let used = Self::executed_per_function(profiled)
                .values()
                .filter(|&&executed| executed > 0)
                .count();
            writeln!(out, "  Profiled blocks: {}", profiled.blocks.len())?;
            writeln!(
                out,
                "  Executed instructions: {}",
                Self::total_executed(profiled)
            )?;
            writeln!(
                out,
                "  Functions executed: {used}/{}",
                m.function_count()
            )?;
        }
        Ok(())
    }

    fn function_from_virtual_offset(&self, virtual_offset: u32) -> Option<u32> {
        self.module.function_at_virtual_offset(virtual_offset)
    }

    fn dump_epilogue(&self, out: &mut dyn Write) -> InspectResult {
        let epilogue = self.module.epilogue();
        writeln!(out, "Epilogue ({} bytes):", epilogue.len())?;
        for (row, chunk) in epilogue.chunks(16).enumerate() {
            let hex: Vec<String> = chunk.iter().map(|b| format!("{b:02x}")).collect();
            let ascii: String = chunk
                .iter()
                .map(|&b| {
                    if b.is_ascii_graphic() || b == b' ' {
                        b as char
                    } else {
                        '.'
                    }
                })
                .collect();
            writeln!(out, "  {:08x}  {:<47}  |{ascii}|", row * 16, hex.join(" "))?;
        }
        Ok(())
    }
}
