//! Aggregation of per-context checkpoint data into summary statistics.

use std::fmt;
use std::io::{self, Write};
use std::result::Result as StdResult;

use crate::{CheckpointId, CheckpointSlot, ContextId, ContextSnapshot, Result, ScaledDurations, merge};

const NANOS_PER_SECOND: f64 = 1_000_000_000.0;

/// Summary statistics of all execution contexts of an [`Engine`](crate::Engine).
///
/// A report is a self-contained copy of the data at the time it was taken. Every section is
/// always computed; [`ReportOptions`] only controls which sections are rendered as text.
///
/// # Example
///
/// ```
/// use checkpoint_timer::{Engine, ReportOptions};
///
/// # fn main() -> checkpoint_timer::Result<()> {
/// let engine = Engine::builder().build();
///
/// for _ in 0..10 {
///     engine.checkpoint(1)?;
///     std::hint::black_box((0..1000).sum::<u64>());
///     engine.checkpoint(2)?;
/// }
///
/// let report = engine.to_report()?;
///
/// for context in report.contexts() {
///     for stats in context.checkpoints() {
///         println!(
///             "context {} checkpoint {}: {} iterations, {} ns on average",
///             context.ordinal(),
///             stats.checkpoint(),
///             stats.iterations(),
///             stats.average_nanos()
///         );
///     }
/// }
///
/// let mut text = Vec::new();
/// report.write_to(&mut text, &ReportOptions::all())?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct Report {
    configured_contexts: usize,
    registered_contexts: usize,
    contexts: Vec<ContextReport>,
    weighted_averages: Vec<WeightedAverage>,
    throughput: Option<Throughput>,
    context_table: Vec<ContextEntry>,
}

/// Statistics of one execution context that hit at least one checkpoint.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ContextReport {
    context: ContextId,
    ordinal: usize,
    checkpoints: Vec<CheckpointStats>,
}

/// Statistics of one checkpoint within one execution context.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct CheckpointStats {
    checkpoint: CheckpointId,
    iterations: u64,
    total_nanos: u64,
    average_nanos: u64,
}

/// Per-context mean of a checkpoint that was hit in more than one execution context.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct WeightedAverage {
    checkpoint: CheckpointId,
    contributing_contexts: usize,
    iterations: u64,
    total_nanos: u64,
    average_nanos: u64,
}

/// Iterations per second of processor time, measured at a reference checkpoint.
#[derive(Clone, Debug, PartialEq)]
pub struct Throughput {
    reference: CheckpointId,
    contexts: Vec<ContextThroughput>,
    excluded: Vec<ThroughputExclusion>,
    total_per_second: f64,
}

/// Throughput of one execution context.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ContextThroughput {
    context: ContextId,
    ordinal: usize,
    start_nanos: u64,
    end_nanos: u64,
    iterations: u64,
    per_second: f64,
}

/// An execution context left out of the throughput calculation.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ThroughputExclusion {
    context: ContextId,
    ordinal: usize,
    reason: ExclusionReason,
}

/// Why an execution context does not contribute to the throughput.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub enum ExclusionReason {
    /// The context never hit the reference checkpoint.
    ReferenceNotReached,

    /// No processor time elapsed between context registration and the reference checkpoint.
    NoElapsedTime,
}

/// Maps the ordinal of a registered execution context to its identifier.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ContextEntry {
    ordinal: usize,
    context: ContextId,
}

/// Selects the sections of a [`Report`] that are rendered as text.
///
/// By default only the header and the per-context detail lines are rendered.
///
/// ```
/// use checkpoint_timer::ReportOptions;
///
/// let options = ReportOptions::default().throughput(true);
/// # _ = options;
/// ```
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[must_use]
pub struct ReportOptions {
    detail: bool,
    weighted_averages: bool,
    throughput: bool,
    context_table: bool,
}

impl ReportOptions {
    /// Renders every section.
    pub const fn all() -> Self {
        Self {
            detail: true,
            weighted_averages: true,
            throughput: true,
            context_table: true,
        }
    }

    /// Renders only the header line.
    pub const fn minimal() -> Self {
        Self {
            detail: false,
            weighted_averages: false,
            throughput: false,
            context_table: false,
        }
    }

    /// Whether to render one line per (context, checkpoint) pair.
    pub const fn detail(self, detail: bool) -> Self {
        Self { detail, ..self }
    }

    /// Whether to render the per-checkpoint averages across contexts.
    pub const fn weighted_averages(self, weighted_averages: bool) -> Self {
        Self {
            weighted_averages,
            ..self
        }
    }

    /// Whether to render the throughput section.
    pub const fn throughput(self, throughput: bool) -> Self {
        Self { throughput, ..self }
    }

    /// Whether to render the table mapping context ordinals to context identifiers.
    pub const fn context_table(self, context_table: bool) -> Self {
        Self {
            context_table,
            ..self
        }
    }
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self::minimal().detail(true)
    }
}

/// Running merge of one checkpoint across contexts.
#[derive(Clone, Copy, Default)]
struct CheckpointTotals {
    merged: CheckpointSlot,
    contributing_contexts: usize,
}

impl Report {
    /// Aggregates context snapshots, which must be in registration order.
    pub(crate) fn from_snapshots(
        configured_contexts: usize,
        registered_contexts: usize,
        snapshots: &[ContextSnapshot],
    ) -> Self {
        let checkpoint_count = snapshots.iter().map(|s| s.slots().len()).max().unwrap_or(0);
        let mut totals = vec![CheckpointTotals::default(); checkpoint_count];

        let contexts = snapshots
            .iter()
            .filter(|snapshot| !snapshot.is_empty())
            .map(|snapshot| {
                for (slot, total) in snapshot.slots().iter().zip(totals.iter_mut()) {
                    if !slot.is_empty() {
                        total.merged = merge(total.merged, *slot);
                        total.contributing_contexts = total.contributing_contexts.saturating_add(1);
                    }
                }

                ContextReport::from_snapshot(snapshot)
            })
            .collect();

        let weighted_averages = totals
            .iter()
            .enumerate()
            .filter_map(|(id, total)| WeightedAverage::from_totals(CheckpointId::new(id), total))
            .collect();

        let context_table = snapshots
            .iter()
            .map(|snapshot| ContextEntry {
                ordinal: snapshot.ordinal(),
                context: snapshot.context(),
            })
            .collect();

        Self {
            configured_contexts,
            registered_contexts,
            contexts,
            weighted_averages,
            throughput: Throughput::from_snapshots(snapshots),
            context_table,
        }
    }

    /// The configured context capacity, 0 in single-context mode.
    #[must_use]
    pub fn configured_contexts(&self) -> usize {
        self.configured_contexts
    }

    /// How many execution contexts had registered when the report was taken.
    #[must_use]
    pub fn registered_contexts(&self) -> usize {
        self.registered_contexts
    }

    /// Statistics of every context that hit at least one checkpoint, in registration order.
    #[must_use]
    pub fn contexts(&self) -> &[ContextReport] {
        &self.contexts
    }

    /// Per-context means of every checkpoint hit in more than one context, by checkpoint.
    #[must_use]
    pub fn weighted_averages(&self) -> &[WeightedAverage] {
        &self.weighted_averages
    }

    /// Throughput at the reference checkpoint, or `None` if the first registered context never
    /// hit any checkpoint.
    #[must_use]
    pub fn throughput(&self) -> Option<&Throughput> {
        self.throughput.as_ref()
    }

    /// Every registered context, in registration order.
    #[must_use]
    pub fn context_table(&self) -> &[ContextEntry] {
        &self.context_table
    }

    /// Whether no checkpoint was hit in any context.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }

    /// Renders the sections selected by `options` to `destination`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`](crate::Error::Io) if writing fails.
    pub fn write_to(&self, destination: &mut impl Write, options: &ReportOptions) -> Result<()> {
        write!(
            destination,
            "{}",
            RenderedReport {
                report: self,
                options
            }
        )?;

        Ok(())
    }

    /// Prints the report with the default options to stdout.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`](crate::Error::Io) if writing fails.
    #[cfg_attr(test, mutants::skip)] // Too difficult to test stdout output reliably - manually tested.
    pub fn print_to_stdout(&self) -> Result<()> {
        self.write_to(&mut io::stdout().lock(), &ReportOptions::default())
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered = RenderedReport {
            report: self,
            options: &ReportOptions::default(),
        };

        fmt::Display::fmt(&rendered, f)
    }
}

struct RenderedReport<'a> {
    report: &'a Report,
    options: &'a ReportOptions,
}

impl fmt::Display for RenderedReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Self { report, options } = self;

        writeln!(
            f,
            "Contexts [configured, used] = [{}, {}]",
            report.configured_contexts, report.registered_contexts
        )?;

        if options.detail {
            for context in &report.contexts {
                writeln!(f)?;
                write!(f, "{context}")?;
            }
        }

        if options.weighted_averages && !report.weighted_averages.is_empty() {
            writeln!(f)?;
            for average in &report.weighted_averages {
                writeln!(f, "{average}")?;
            }
        }

        if options.throughput {
            if let Some(throughput) = &report.throughput {
                writeln!(f)?;
                write!(f, "{throughput}")?;
            }
        }

        if options.context_table {
            writeln!(f)?;
            writeln!(f, "Context identifiers [{}]", report.context_table.len())?;
            for entry in &report.context_table {
                writeln!(f, "{entry}")?;
            }
        }

        Ok(())
    }
}

impl ContextReport {
    fn from_snapshot(snapshot: &ContextSnapshot) -> Self {
        let checkpoints = snapshot
            .slots()
            .iter()
            .enumerate()
            .filter_map(|(id, slot)| CheckpointStats::from_slot(CheckpointId::new(id), slot))
            .collect();

        Self {
            context: snapshot.context(),
            ordinal: snapshot.ordinal(),
            checkpoints,
        }
    }

    /// The execution context the statistics belong to.
    #[must_use]
    pub fn context(&self) -> ContextId {
        self.context
    }

    /// Position of the context in registration order, starting from 0.
    #[must_use]
    pub fn ordinal(&self) -> usize {
        self.ordinal
    }

    /// Statistics of every checkpoint hit in this context, by checkpoint.
    #[must_use]
    pub fn checkpoints(&self) -> &[CheckpointStats] {
        &self.checkpoints
    }
}

impl fmt::Display for ContextReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for stats in &self.checkpoints {
            writeln!(f, "Context [{}] {stats}", self.ordinal)?;
        }

        Ok(())
    }
}

impl CheckpointStats {
    fn from_slot(checkpoint: CheckpointId, slot: &CheckpointSlot) -> Option<Self> {
        Some(Self {
            checkpoint,
            iterations: slot.iterations(),
            total_nanos: slot.total_elapsed_nanos(),
            average_nanos: slot.average_nanos()?,
        })
    }

    /// The checkpoint the statistics belong to.
    #[must_use]
    pub fn checkpoint(&self) -> CheckpointId {
        self.checkpoint
    }

    /// How many times the checkpoint was hit.
    #[must_use]
    pub fn iterations(&self) -> u64 {
        self.iterations
    }

    /// Total elapsed nanoseconds attributed to the checkpoint.
    #[must_use]
    pub fn total_nanos(&self) -> u64 {
        self.total_nanos
    }

    /// Mean elapsed nanoseconds per hit.
    #[must_use]
    pub fn average_nanos(&self) -> u64 {
        self.average_nanos
    }

    /// Average and total in a common display unit.
    #[must_use]
    pub fn scaled(&self) -> ScaledDurations {
        ScaledDurations::new(self.average_nanos, self.total_nanos)
    }
}

impl fmt::Display for CheckpointStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Checkpoint [{}] Iterations [{}] {}",
            self.checkpoint,
            self.iterations,
            self.scaled()
        )
    }
}

impl WeightedAverage {
    fn from_totals(checkpoint: CheckpointId, totals: &CheckpointTotals) -> Option<Self> {
        if totals.contributing_contexts <= 1 {
            return None;
        }

        let contexts = u64::try_from(totals.contributing_contexts).ok()?;
        let iterations = totals.merged.iterations().checked_div(contexts)?;
        let total_nanos = totals.merged.total_elapsed_nanos().checked_div(contexts)?;

        Some(Self {
            checkpoint,
            contributing_contexts: totals.contributing_contexts,
            iterations,
            total_nanos,
            average_nanos: total_nanos.checked_div(iterations)?,
        })
    }

    /// The checkpoint the average belongs to.
    #[must_use]
    pub fn checkpoint(&self) -> CheckpointId {
        self.checkpoint
    }

    /// How many contexts hit the checkpoint.
    #[must_use]
    pub fn contributing_contexts(&self) -> usize {
        self.contributing_contexts
    }

    /// Mean iterations per contributing context.
    #[must_use]
    pub fn iterations(&self) -> u64 {
        self.iterations
    }

    /// Mean total elapsed nanoseconds per contributing context.
    #[must_use]
    pub fn total_nanos(&self) -> u64 {
        self.total_nanos
    }

    /// Mean elapsed nanoseconds per hit, derived from the per-context means.
    #[must_use]
    pub fn average_nanos(&self) -> u64 {
        self.average_nanos
    }

    /// Average and total in a common display unit.
    #[must_use]
    pub fn scaled(&self) -> ScaledDurations {
        ScaledDurations::new(self.average_nanos, self.total_nanos)
    }
}

impl fmt::Display for WeightedAverage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Weighted Average: Checkpoint [{}] Contexts [{}] Iterations [{}] {}",
            self.checkpoint,
            self.contributing_contexts,
            self.iterations,
            self.scaled()
        )
    }
}

impl Throughput {
    fn from_snapshots(snapshots: &[ContextSnapshot]) -> Option<Self> {
        let reference = reference_checkpoint(snapshots.first()?)?;

        let mut contexts = Vec::new();
        let mut excluded = Vec::new();

        for snapshot in snapshots.iter().filter(|snapshot| !snapshot.is_empty()) {
            match ContextThroughput::measure(snapshot, reference) {
                Ok(throughput) => contexts.push(throughput),
                Err(reason) => excluded.push(ThroughputExclusion {
                    context: snapshot.context(),
                    ordinal: snapshot.ordinal(),
                    reason,
                }),
            }
        }

        let total_per_second = contexts.iter().map(|c| c.per_second).sum();

        Some(Self {
            reference,
            contexts,
            excluded,
            total_per_second,
        })
    }

    /// The checkpoint at which iterations are counted: the highest checkpoint hit by the first
    /// registered context.
    #[must_use]
    pub fn reference(&self) -> CheckpointId {
        self.reference
    }

    /// Throughput of every context that reached the reference checkpoint, in registration order.
    #[must_use]
    pub fn contexts(&self) -> &[ContextThroughput] {
        &self.contexts
    }

    /// Contexts that hit checkpoints but do not contribute to the throughput.
    #[must_use]
    pub fn excluded(&self) -> &[ThroughputExclusion] {
        &self.excluded
    }

    /// Sum of the throughput of all contributing contexts, in iterations per second.
    #[must_use]
    pub fn total_per_second(&self) -> f64 {
        self.total_per_second
    }
}

fn reference_checkpoint(first: &ContextSnapshot) -> Option<CheckpointId> {
    first
        .slots()
        .iter()
        .rposition(|slot| !slot.is_empty())
        .map(CheckpointId::new)
}

impl fmt::Display for Throughput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Throughput for each context at checkpoint [{}]:", self.reference)?;

        for context in &self.contexts {
            writeln!(f, "{context}")?;
        }

        for exclusion in &self.excluded {
            writeln!(f, "{exclusion}")?;
        }

        writeln!(f, "Total Throughput (iters/sec) = {:.2}", self.total_per_second)
    }
}

impl ContextThroughput {
    fn measure(
        snapshot: &ContextSnapshot,
        reference: CheckpointId,
    ) -> StdResult<Self, ExclusionReason> {
        let slot = snapshot
            .slot(reference)
            .filter(|slot| !slot.is_empty())
            .ok_or(ExclusionReason::ReferenceNotReached)?;

        let start_nanos = snapshot.created_at_nanos();
        let end_nanos = slot.last_timestamp_nanos();
        let elapsed_nanos = end_nanos.saturating_sub(start_nanos);

        if elapsed_nanos == 0 {
            return Err(ExclusionReason::NoElapsedTime);
        }

        Ok(Self {
            context: snapshot.context(),
            ordinal: snapshot.ordinal(),
            start_nanos,
            end_nanos,
            iterations: slot.iterations(),
            per_second: per_second(slot.iterations(), elapsed_nanos),
        })
    }

    /// The execution context the throughput belongs to.
    #[must_use]
    pub fn context(&self) -> ContextId {
        self.context
    }

    /// Position of the context in registration order, starting from 0.
    #[must_use]
    pub fn ordinal(&self) -> usize {
        self.ordinal
    }

    /// Timestamp at which the context registered, in nanoseconds.
    #[must_use]
    pub fn start_nanos(&self) -> u64 {
        self.start_nanos
    }

    /// Timestamp of the last hit of the reference checkpoint, in nanoseconds.
    #[must_use]
    pub fn end_nanos(&self) -> u64 {
        self.end_nanos
    }

    /// How many times the context hit the reference checkpoint.
    #[must_use]
    pub fn iterations(&self) -> u64 {
        self.iterations
    }

    /// Iterations per second of processor time.
    #[must_use]
    pub fn per_second(&self) -> f64 {
        self.per_second
    }
}

#[expect(
    clippy::cast_precision_loss,
    reason = "throughput is an estimate, precision loss above 2^53 is irrelevant"
)]
fn per_second(iterations: u64, elapsed_nanos: u64) -> f64 {
    iterations as f64 / (elapsed_nanos as f64 / NANOS_PER_SECOND)
}

impl fmt::Display for ContextThroughput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Context [{}] Time ns [start, end, diff] = [{}, {}, {}], iterations = {}, throughput (iters/sec) = {:.2}",
            self.ordinal,
            self.start_nanos,
            self.end_nanos,
            self.end_nanos.saturating_sub(self.start_nanos),
            self.iterations,
            self.per_second
        )
    }
}

impl ThroughputExclusion {
    /// The execution context left out.
    #[must_use]
    pub fn context(&self) -> ContextId {
        self.context
    }

    /// Position of the context in registration order, starting from 0.
    #[must_use]
    pub fn ordinal(&self) -> usize {
        self.ordinal
    }

    /// Why the context was left out.
    #[must_use]
    pub fn reason(&self) -> ExclusionReason {
        self.reason
    }
}

impl fmt::Display for ThroughputExclusion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self.reason {
            ExclusionReason::ReferenceNotReached => "reference checkpoint not reached",
            ExclusionReason::NoElapsedTime => "no elapsed time",
        };

        write!(f, "Context [{}] excluded: {reason}", self.ordinal)
    }
}

impl ContextEntry {
    /// Position of the context in registration order, starting from 0.
    #[must_use]
    pub fn ordinal(&self) -> usize {
        self.ordinal
    }

    /// The identifier of the context.
    #[must_use]
    pub fn context(&self) -> ContextId {
        self.context
    }
}

impl fmt::Display for ContextEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\tContext [{}] => [{}]", self.ordinal, self.context)
    }
}
