/// Execution classes used for worker scheduling and observability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskClass {
	/// Short async units that contend for shared state and park on timers.
	Assembly,
	/// Synchronous closures executed on the blocking pool.
	Blocking,
	/// Bookkeeping work that can be delayed under pressure.
	Background,
}

impl TaskClass {
	pub(crate) const fn as_str(self) -> &'static str {
		match self {
			Self::Assembly => "assembly",
			Self::Blocking => "blocking",
			Self::Background => "background",
		}
	}
}
