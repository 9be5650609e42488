//! State-table construction for the 16-bit FSE coder.
//!
//! The coder drives a table of `1 << table_log` states. Decoding is a pure
//! table walk: look up the state's symbol, read a few bits, jump to the
//! next state. Encoding inverts the decode table: for each symbol, the
//! decode entries that emit it partition the state space into ranges, and
//! the encoder binary-searches the range holding its current state.

/// Largest symbol value the coder accepts: deltas are 12-bit.
pub const MAX_SYMBOL: u16 = 4095;

/// Size of the symbol alphabet.
pub(crate) const ALPHABET: usize = MAX_SYMBOL as usize + 1;

/// Table log used when the caller requests the default (0).
pub(crate) const DEFAULT_TABLE_LOG: u8 = 11;

/// Smallest accepted table log; below this the table cannot represent a
/// useful distribution over 12-bit symbols.
pub(crate) const MIN_TABLE_LOG: u8 = 5;

/// Largest accepted table log. 12 suffices to give every symbol of the
/// full alphabet a state.
pub(crate) const MAX_TABLE_LOG: u8 = 12;

/// Normalized frequency table: `freq` spans the whole alphabet and sums to
/// exactly `1 << table_log`, with every present symbol at least 1.
pub(crate) struct NormalizedFreqs {
    pub freq: Vec<u16>,
    pub table_log: u8,
}

/// Resolve a requested table log: 0 means default, out-of-range values are
/// clamped, and the log is raised until the table can hold one state per
/// present symbol.
pub(crate) fn choose_table_log(requested: u8, present: usize) -> u8 {
    let mut log = if requested == 0 {
        DEFAULT_TABLE_LOG
    } else {
        requested.clamp(MIN_TABLE_LOG, MAX_TABLE_LOG)
    };
    while (1usize << log) < present {
        log += 1;
    }
    log
}

/// Floor of log2 for a positive integer.
#[inline]
pub(crate) fn highest_bit_set(x: u32) -> u8 {
    debug_assert!(x > 0);
    (31 - x.leading_zeros()) as u8
}

/// Normalize raw counts so they sum to exactly `1 << table_log`.
///
/// Every present symbol keeps at least 1; the rounding remainder is
/// settled round-robin over the present symbols, largest counts first.
/// Callers guarantee at least two distinct symbols (one-symbol inputs
/// short-circuit before any table work).
pub(crate) fn normalize_frequencies(hist: &[u32], total: u32, table_log: u8) -> NormalizedFreqs {
    let table_size = 1u32 << table_log;

    let mut present: Vec<usize> = (0..hist.len()).filter(|&i| hist[i] > 0).collect();
    debug_assert!(present.len() >= 2);
    debug_assert!(present.len() <= table_size as usize);
    present.sort_by(|&a, &b| hist[b].cmp(&hist[a]));

    let mut freq = vec![0u16; hist.len()];
    let mut distributed = 0u32;
    for &i in &present {
        let scaled = ((hist[i] as u64 * table_size as u64) / total as u64).max(1) as u32;
        freq[i] = scaled as u16;
        distributed += scaled;
    }

    // Settle the rounding difference to hit the exact table size. The
    // downward loop terminates because the sum can always shrink to
    // present.len() <= table_size while keeping every entry >= 1.
    let mut diff = table_size as i64 - distributed as i64;
    let mut idx = 0;
    while diff > 0 {
        freq[present[idx % present.len()]] += 1;
        diff -= 1;
        idx += 1;
    }
    while diff < 0 {
        let sym = present[idx % present.len()];
        if freq[sym] > 1 {
            freq[sym] -= 1;
            diff += 1;
        }
        idx += 1;
    }

    debug_assert_eq!(freq.iter().map(|&f| f as u32).sum::<u32>(), table_size);

    NormalizedFreqs { freq, table_log }
}

/// Spread symbols across the state table with the classic FSE step.
///
/// The step is odd, hence coprime with the power-of-two table size, so the
/// position sequence visits every slot exactly once.
pub(crate) fn spread_symbols(norm: &NormalizedFreqs) -> Vec<u16> {
    let table_size = 1usize << norm.table_log;
    let mask = table_size - 1;
    let step = (table_size >> 1) + (table_size >> 3) + 3;

    let mut table = vec![0u16; table_size];
    let mut pos = 0usize;
    for (symbol, &f) in norm.freq.iter().enumerate() {
        for _ in 0..f {
            table[pos] = symbol as u16;
            pos = (pos + step) & mask;
        }
    }
    debug_assert_eq!(pos, 0);
    table
}

/// Entry in the decoding table, indexed directly by state.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct DecodeEntry {
    pub symbol: u16,
    pub bits: u8,
    pub next_state_base: u16,
}

/// Build the decode table from the spread symbol assignment.
///
/// Each symbol's destination counter starts at its frequency and
/// increments per occupied state; the bit count and base fall out of the
/// counter's magnitude.
pub(crate) fn build_decode_table(norm: &NormalizedFreqs, spread: &[u16]) -> Vec<DecodeEntry> {
    let table_size = 1usize << norm.table_log;
    let mut decode = vec![DecodeEntry::default(); table_size];

    let mut next_state: Vec<u32> = norm.freq.iter().map(|&f| f as u32).collect();
    for (state, entry) in decode.iter_mut().enumerate() {
        let symbol = spread[state] as usize;
        let dest = next_state[symbol];
        next_state[symbol] += 1;
        if dest == 0 {
            // Unreachable for a consistent spread; keep the default entry
            // rather than shifting by a negative amount.
            continue;
        }

        let bits = norm.table_log - highest_bit_set(dest);
        let next_state_base = ((dest as usize) << bits) - table_size;
        *entry = DecodeEntry {
            symbol: symbol as u16,
            bits,
            next_state_base: next_state_base as u16,
        };
    }

    decode
}

/// One encoding transition: from any state in `[base, base + 2^bits)`,
/// emit `state - base` in `bits` bits and move to `state`.
#[derive(Debug, Clone, Copy)]
pub(crate) struct EncodeMapping {
    /// Decode-table index to transition to.
    pub state: u16,
    pub bits: u8,
    /// First encoding state this transition covers.
    pub base: u16,
}

/// Per-symbol encode transitions, sorted by covered range.
///
/// A symbol with frequency f owns f transitions whose ranges partition the
/// whole state space, so a binary search by base always lands on the one
/// holding the current state. (A flat state-indexed lookup would be larger
/// than the data being coded at this alphabet size.)
#[derive(Debug, Clone, Default)]
pub(crate) struct SymbolEncodeTable {
    ranges: Vec<EncodeMapping>,
}

impl SymbolEncodeTable {
    /// Find the transition whose range holds `state`.
    #[inline]
    pub fn find(&self, state: usize) -> &EncodeMapping {
        let idx = self.ranges.partition_point(|m| (m.base as usize) <= state);
        &self.ranges[idx - 1]
    }
}

/// Invert the decode table into per-symbol encode tables.
pub(crate) fn build_encode_tables(
    norm: &NormalizedFreqs,
    decode: &[DecodeEntry],
) -> Vec<SymbolEncodeTable> {
    let mut tables = vec![SymbolEncodeTable::default(); norm.freq.len()];
    for (state, entry) in decode.iter().enumerate() {
        tables[entry.symbol as usize].ranges.push(EncodeMapping {
            state: state as u16,
            bits: entry.bits,
            base: entry.next_state_base,
        });
    }
    for table in tables.iter_mut() {
        table.ranges.sort_by_key(|m| m.base);
    }
    tables
}
