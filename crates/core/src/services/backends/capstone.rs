use std::fs;
use std::path::Path;

use capstone::{arch, prelude::*, Capstone};
use goblin::{elf, mach, pe, Object};
use tracing::{debug, warn};

use crate::model::ArchFlags;
use crate::services::host::{
    DecodedInstruction, FunctionChunk, HostBinary, HostError, ImportModule,
};

/// Address at which unparseable blobs are mapped.
pub const RAW_BASE_ADDRESS: u64 = 0x1000;

/// Longest instruction any supported architecture can encode.
const MAX_INSN_LEN: u64 = 16;

// Mach-O section attribute flags.
const S_ATTR_PURE_INSTRUCTIONS: u32 = 0x8000_0000;
const S_ATTR_SOME_INSTRUCTIONS: u32 = 0x0000_0400;

/// File-backed address range.
#[derive(Debug, Clone)]
struct MappedRange {
    name: String,
    start: u64,
    end: u64,
    file_offset: u64,
    executable: bool,
}

impl MappedRange {
    fn contains(&self, address: u64) -> bool {
        address >= self.start && address < self.end
    }
}

#[derive(Debug, Clone)]
struct SymbolInfo {
    name: String,
    address: u64,
    size: Option<u64>,
}

#[derive(Debug, Clone)]
struct NamedChunk {
    name: String,
    chunk: FunctionChunk,
}

/// Everything pulled out of the object headers before disassembly.
#[derive(Debug, Default)]
struct ObjectLayout {
    arch: Option<String>,
    bits: Option<u32>,
    ranges: Vec<MappedRange>,
    symbols: Vec<SymbolInfo>,
    imports: Vec<ImportModule>,
}

fn capstone_arch_from_hint(hint: Option<&str>) -> Option<String> {
    hint.map(|h| h.to_lowercase())
}

fn bits_for_arch(arch: &str) -> u32 {
    match arch {
        "x86_64" | "amd64" | "arm64" | "aarch64" | "riscv" | "riscv64" | "ppc" | "powerpc"
        | "ppc64" => 64,
        _ => 32,
    }
}

fn make_cs(arch: &str) -> Result<Capstone, HostError> {
    let built = match arch {
        "x86_64" | "amd64" => Capstone::new().x86().mode(arch::x86::ArchMode::Mode64).build(),
        "x86" | "i386" => Capstone::new().x86().mode(arch::x86::ArchMode::Mode32).build(),
        "arm" | "armv7" => Capstone::new().arm().mode(arch::arm::ArchMode::Arm).build(),
        "arm64" | "aarch64" => Capstone::new().arm64().mode(arch::arm64::ArchMode::Arm).build(),
        "riscv" | "riscv64" => {
            Capstone::new().riscv().mode(arch::riscv::ArchMode::RiscV64).build()
        }
        "riscv32" => Capstone::new().riscv().mode(arch::riscv::ArchMode::RiscV32).build(),
        "ppc" | "powerpc" | "ppc64" => {
            Capstone::new().ppc().mode(arch::ppc::ArchMode::Mode64).build()
        }
        other => return Err(HostError::UnsupportedArch(other.to_string())),
    };
    built.map_err(|e| HostError::Disassembler(format!("capstone init failed for {arch}: {e}")))
}

/// Group `(module, symbol)` pairs by module, keeping first-seen module order.
fn group_imports<'a>(pairs: impl IntoIterator<Item = (&'a str, String)>) -> Vec<ImportModule> {
    let mut modules: Vec<ImportModule> = Vec::new();
    for (module, symbol) in pairs {
        match modules.iter_mut().find(|m| m.name == module) {
            Some(existing) => existing.symbols.push(symbol),
            None => modules.push(ImportModule { name: module.to_string(), symbols: vec![symbol] }),
        }
    }
    modules
}

fn elf_layout(elf: &elf::Elf) -> ObjectLayout {
    let arch = match elf.header.e_machine {
        elf::header::EM_X86_64 => Some("x86_64".to_string()),
        elf::header::EM_386 => Some("x86".to_string()),
        elf::header::EM_AARCH64 => Some("arm64".to_string()),
        elf::header::EM_ARM => Some("arm".to_string()),
        elf::header::EM_RISCV => {
            Some(if elf.is_64 { "riscv64" } else { "riscv32" }.to_string())
        }
        _ => None,
    };

    // Relocatable objects have no load addresses; map their sections at
    // their file offsets instead.
    let relocatable = elf.header.e_type == elf::header::ET_REL;
    let section_base =
        |sh: &elf::SectionHeader| if relocatable { sh.sh_offset } else { sh.sh_addr };

    let mut ranges = Vec::new();
    for sh in &elf.section_headers {
        let allocated = sh.sh_flags & u64::from(elf::section_header::SHF_ALLOC) != 0;
        if sh.sh_type == elf::section_header::SHT_NOBITS || sh.sh_size == 0 {
            continue;
        }
        if !relocatable && !allocated {
            continue;
        }
        let start = section_base(sh);
        ranges.push(MappedRange {
            name: elf.shdr_strtab.get_at(sh.sh_name).unwrap_or("").to_string(),
            start,
            end: start.saturating_add(sh.sh_size),
            file_offset: sh.sh_offset,
            executable: sh.sh_flags & u64::from(elf::section_header::SHF_EXECINSTR) != 0,
        });
    }

    let mut symbols = Vec::new();
    let tables = [(&elf.syms, &elf.strtab), (&elf.dynsyms, &elf.dynstrtab)];
    for (syms, strtab) in tables {
        for sym in syms.iter() {
            if !sym.is_function() || sym.st_shndx == elf::section_header::SHN_UNDEF as usize {
                continue;
            }
            let name = strtab.get_at(sym.st_name).unwrap_or("").to_string();
            if name.is_empty() {
                continue;
            }
            let address = match elf.section_headers.get(sym.st_shndx) {
                Some(sh) if relocatable => section_base(sh).saturating_add(sym.st_value),
                _ => sym.st_value,
            };
            let size = if sym.st_size > 0 { Some(sym.st_size) } else { None };
            symbols.push(SymbolInfo { name, address, size });
        }
    }

    let imported = elf.dynsyms.iter().filter_map(|sym| {
        if sym.st_shndx != elf::section_header::SHN_UNDEF as usize {
            return None;
        }
        let name = elf.dynstrtab.get_at(sym.st_name).unwrap_or("");
        if name.is_empty() {
            None
        } else {
            Some(("*", name.to_string()))
        }
    });

    ObjectLayout {
        arch,
        bits: Some(if elf.is_64 { 64 } else { 32 }),
        ranges,
        symbols,
        imports: group_imports(imported),
    }
}

fn pe_layout(pe: &pe::PE) -> ObjectLayout {
    let arch = match pe.header.coff_header.machine {
        pe::header::COFF_MACHINE_X86 => Some("x86".to_string()),
        pe::header::COFF_MACHINE_X86_64 => Some("x86_64".to_string()),
        pe::header::COFF_MACHINE_ARM => Some("arm".to_string()),
        pe::header::COFF_MACHINE_ARM64 => Some("arm64".to_string()),
        _ => None,
    };

    let ranges: Vec<MappedRange> = pe
        .sections
        .iter()
        .filter(|sec| sec.size_of_raw_data > 0)
        .map(|sec| {
            let start = u64::from(sec.virtual_address);
            let size = if sec.virtual_size == 0 {
                sec.size_of_raw_data
            } else {
                sec.virtual_size.min(sec.size_of_raw_data)
            };
            let code = pe::section_table::IMAGE_SCN_MEM_EXECUTE
                | pe::section_table::IMAGE_SCN_CNT_CODE;
            MappedRange {
                name: sec.name().unwrap_or_default().to_string(),
                start,
                end: start + u64::from(size),
                file_offset: u64::from(sec.pointer_to_raw_data),
                executable: sec.characteristics & code != 0,
            }
        })
        .collect();

    let mut symbols: Vec<SymbolInfo> = pe
        .exports
        .iter()
        .filter(|exp| exp.rva != 0)
        .filter_map(|exp| {
            let name = exp.name.unwrap_or_default();
            if name.is_empty() {
                return None;
            }
            Some(SymbolInfo { name: name.to_string(), address: exp.rva as u64, size: None })
        })
        .collect();
    if pe.entry != 0 && !symbols.iter().any(|s| s.address == pe.entry as u64) {
        let entry = SymbolInfo { name: "start".to_string(), address: pe.entry as u64, size: None };
        symbols.push(entry);
    }

    let imported = pe.imports.iter().map(|imp| (imp.dll, imp.name.to_string()));

    ObjectLayout {
        arch,
        bits: Some(if pe.is_64 { 64 } else { 32 }),
        ranges,
        symbols,
        imports: group_imports(imported),
    }
}

fn mach_layout(bin: &mach::MachO) -> ObjectLayout {
    let arch = match bin.header.cputype() {
        mach::cputype::CPU_TYPE_X86 => Some("x86".to_string()),
        mach::cputype::CPU_TYPE_X86_64 => Some("x86_64".to_string()),
        mach::cputype::CPU_TYPE_ARM => Some("arm".to_string()),
        mach::cputype::CPU_TYPE_ARM64 => Some("arm64".to_string()),
        _ => None,
    };
    let relocatable = bin.header.filetype == mach::header::MH_OBJECT;

    // Keep the section list index-aligned with `n_sect - 1`.
    let sections: Vec<mach::segment::Section> =
        bin.segments.sections().flatten().filter_map(Result::ok).map(|(sec, _)| sec).collect();
    let ranges: Vec<MappedRange> = sections
        .iter()
        .map(|sec| {
            let start = if relocatable { u64::from(sec.offset) } else { sec.addr };
            MappedRange {
                name: sec.name().unwrap_or("").to_string(),
                start,
                end: start.saturating_add(sec.size),
                file_offset: u64::from(sec.offset),
                executable: sec.flags & (S_ATTR_PURE_INSTRUCTIONS | S_ATTR_SOME_INSTRUCTIONS) != 0,
            }
        })
        .collect();

    let mut symbols = Vec::new();
    for sym in bin.symbols() {
        let Ok((name, nlist)) = sym else { continue };
        if nlist.is_stab() || nlist.n_sect == 0 {
            continue;
        }
        let Some(sec) = sections.get(nlist.n_sect - 1) else { continue };
        if sec.flags & (S_ATTR_PURE_INSTRUCTIONS | S_ATTR_SOME_INSTRUCTIONS) == 0 {
            continue;
        }
        let name = name.trim_start_matches('_').to_string();
        if name.is_empty() {
            continue;
        }
        let address = if relocatable {
            u64::from(sec.offset).saturating_add(nlist.n_value.saturating_sub(sec.addr))
        } else {
            nlist.n_value
        };
        symbols.push(SymbolInfo { name, address, size: None });
    }

    let imported = bin
        .imports()
        .unwrap_or_default()
        .into_iter()
        .map(|imp| (imp.dylib, imp.name.trim_start_matches('_').to_string()));

    ObjectLayout {
        arch,
        bits: Some(if bin.is_64 { 64 } else { 32 }),
        ranges,
        symbols,
        imports: group_imports(imported),
    }
}

fn object_layout(bytes: &[u8]) -> Option<ObjectLayout> {
    match Object::parse(bytes) {
        Ok(Object::Elf(elf)) => Some(elf_layout(&elf)),
        Ok(Object::PE(pe)) => Some(pe_layout(&pe)),
        Ok(Object::Mach(mach::Mach::Binary(bin))) => Some(mach_layout(&bin)),
        _ => None,
    }
}

/// Turn symbols into non-overlapping chunks sorted by address.
///
/// Symbols without a size extend to the next symbol or the end of their
/// section, whichever comes first.
fn build_chunks(mut symbols: Vec<SymbolInfo>, ranges: &[MappedRange]) -> Vec<NamedChunk> {
    symbols.sort_by(|a, b| a.address.cmp(&b.address).then(a.name.cmp(&b.name)));
    symbols.dedup_by_key(|s| s.address);

    let mut chunks = Vec::new();
    for (idx, sym) in symbols.iter().enumerate() {
        let Some(range) = ranges.iter().find(|r| r.contains(sym.address)) else {
            debug!("symbol {} at 0x{:X} is not file-backed", sym.name, sym.address);
            continue;
        };
        let next = symbols.get(idx + 1).map(|s| s.address).unwrap_or(u64::MAX);
        let end = match sym.size {
            Some(size) => sym.address.saturating_add(size).min(range.end),
            None => next.min(range.end),
        };
        if end > sym.address {
            chunks.push(NamedChunk {
                name: sym.name.clone(),
                chunk: FunctionChunk::new(sym.address, end),
            });
        }
    }
    chunks
}

/// Host backed by an on-disk binary: `goblin` for the container format,
/// `capstone` for instruction decoding.
pub struct CapstoneHost {
    cs: Capstone,
    bytes: Vec<u8>,
    arch_name: String,
    arch: ArchFlags,
    ranges: Vec<MappedRange>,
    chunks: Vec<NamedChunk>,
    imports: Vec<ImportModule>,
}

impl CapstoneHost {
    /// Load and index the binary at `path`.
    pub fn open(path: &Path, arch_hint: Option<&str>) -> Result<Self, HostError> {
        let bytes = fs::read(path).map_err(|_| HostError::MissingBinary(path.to_path_buf()))?;
        Self::from_bytes(bytes, arch_hint)
    }

    /// Index an in-memory binary image.
    pub fn from_bytes(bytes: Vec<u8>, arch_hint: Option<&str>) -> Result<Self, HostError> {
        let layout = object_layout(&bytes).unwrap_or_default();
        let arch_name = match capstone_arch_from_hint(arch_hint).or_else(|| layout.arch.clone()) {
            Some(name) => name,
            None => {
                warn!("could not determine the architecture; decoding as x86_64");
                "x86_64".to_string()
            }
        };
        let cs = make_cs(&arch_name)?;
        let bits = layout.bits.unwrap_or_else(|| bits_for_arch(&arch_name));

        let mut ranges = layout.ranges;
        let mut chunks = build_chunks(layout.symbols, &ranges);
        if chunks.is_empty() {
            chunks = ranges
                .iter()
                .filter(|r| r.executable && r.end > r.start)
                .map(|r| NamedChunk {
                    name: r.name.clone(),
                    chunk: FunctionChunk::new(r.start, r.end),
                })
                .collect();
            chunks.sort_by_key(|c| c.chunk.start);
        }
        if chunks.is_empty() && !bytes.is_empty() {
            debug!("no sections or symbols recognised; treating input as a raw code blob");
            let end = RAW_BASE_ADDRESS + bytes.len() as u64;
            ranges = vec![MappedRange {
                name: "raw".to_string(),
                start: RAW_BASE_ADDRESS,
                end,
                file_offset: 0,
                executable: true,
            }];
            chunks = vec![NamedChunk {
                name: format!("sub_{RAW_BASE_ADDRESS:X}"),
                chunk: FunctionChunk::new(RAW_BASE_ADDRESS, end),
            }];
        }

        debug!(
            "indexed {} bytes as {arch_name}: {} ranges, {} function chunks",
            bytes.len(),
            ranges.len(),
            chunks.len()
        );

        Ok(Self {
            cs,
            bytes,
            arch_name,
            arch: ArchFlags::from_bitness(bits),
            ranges,
            chunks,
            imports: layout.imports,
        })
    }

    /// Architecture name used to configure the disassembler.
    pub fn arch_name(&self) -> &str {
        &self.arch_name
    }

    /// Number of function chunks discovered.
    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    fn file_slice(&self, address: u64) -> Option<&[u8]> {
        let range = self.ranges.iter().find(|r| r.contains(address))?;
        let start = range.file_offset.checked_add(address - range.start)?;
        let available = (range.end - address).min(MAX_INSN_LEN);
        let end = start.saturating_add(available).min(self.bytes.len() as u64);
        if start >= end {
            return None;
        }
        self.bytes.get(start as usize..end as usize)
    }
}

impl HostBinary for CapstoneHost {
    fn min_address(&self) -> u64 {
        self.ranges
            .iter()
            .map(|r| r.start)
            .chain(self.chunks.iter().map(|c| c.chunk.start))
            .min()
            .unwrap_or(0)
    }

    fn next_chunk(&self, address: u64) -> Option<FunctionChunk> {
        let idx = self.chunks.partition_point(|c| c.chunk.start < address);
        self.chunks.get(idx).map(|c| c.chunk)
    }

    fn decode(&self, address: u64) -> Option<DecodedInstruction> {
        let code = self.file_slice(address)?;
        let insns = self.cs.disasm_count(code, address, 1).ok()?;
        let insn = insns.iter().next()?;
        Some(DecodedInstruction {
            mnemonic: insn.mnemonic().unwrap_or("").to_lowercase(),
            size: insn.bytes().len() as u64,
        })
    }

    fn function_name(&self, address: u64) -> Option<String> {
        self.chunks.iter().find(|c| c.chunk.contains(address)).map(|c| c.name.clone())
    }

    fn import_modules(&self) -> Vec<ImportModule> {
        self.imports.clone()
    }

    fn arch(&self) -> ArchFlags {
        self.arch
    }
}

impl std::fmt::Debug for CapstoneHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CapstoneHost")
            .field("arch_name", &self.arch_name)
            .field("arch", &self.arch)
            .field("bytes", &self.bytes.len())
            .field("chunks", &self.chunks.len())
            .field("imports", &self.imports.len())
            .finish()
    }
}

