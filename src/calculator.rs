//! The calculator controller: input-state machine, calculation dispatch, and
//! the sentinel policy. All mutation goes through the four press operations;
//! the fields themselves are private so the invariants hold by construction.

use crate::backend::{ArithmeticBackend, BackendError, BackendHandle, BackendState};

/// Longest operand the user may type, in characters.
pub const MAX_INPUT_LEN: usize = 15;

/// Longest computed result shown as-is; anything wider collapses to `∞`.
pub const MAX_RESULT_LEN: usize = 18;

/// The four supported binary operators. Closed set: there is no reachable
/// "unknown operator" state anywhere downstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Add,
    Sub,
    Mul,
    Div,
}

impl Operator {
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            '+' => Some(Operator::Add),
            '-' => Some(Operator::Sub),
            '*' => Some(Operator::Mul),
            '/' => Some(Operator::Div),
            _ => None,
        }
    }

    pub fn symbol(self) -> char {
        match self {
            Operator::Add => '+',
            Operator::Sub => '-',
            Operator::Mul => '*',
            Operator::Div => '/',
        }
    }

    /// Fixed dispatch table onto the backend operations.
    pub fn apply(
        self,
        backend: &dyn ArithmeticBackend,
        a: f64,
        b: f64,
    ) -> Result<f64, BackendError> {
        match self {
            Operator::Add => backend.add(a, b),
            Operator::Sub => backend.sub(a, b),
            Operator::Mul => backend.mul(a, b),
            Operator::Div => backend.div(a, b),
        }
    }
}

/// Exceptional calculation outcomes. Every variant surfaces as a display
/// sentinel; none propagate past the controller and none are fatal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalcError {
    /// Backend still initializing.
    PendingInit,
    /// An operand failed to parse as a finite number.
    InvalidOperand,
    /// An operand string is wider than [`MAX_INPUT_LEN`].
    InputTooLong,
    /// Division by zero, a non-finite result, or a result wider than
    /// [`MAX_RESULT_LEN`].
    Overflow,
    /// The backend reported an error during evaluation.
    BackendFailure,
    /// The backend never initialized; arithmetic is permanently unavailable.
    LoadFailure,
}

impl CalcError {
    pub fn sentinel(self) -> &'static str {
        match self {
            CalcError::PendingInit => "...",
            CalcError::InvalidOperand => "Err",
            CalcError::InputTooLong => "MAX",
            CalcError::Overflow => "∞",
            CalcError::BackendFailure => "Err",
            CalcError::LoadFailure => "ERR",
        }
    }
}

/// Resolves one binary operation under the full calculation policy.
///
/// Operands arrive as the display strings the controller holds; the result is
/// the string to display and to store as the next left operand. Policy order:
/// parse, width guard, division-by-zero guard, backend dispatch, result-width
/// guard.
pub fn calculate(
    backend: &dyn ArithmeticBackend,
    op: Operator,
    lhs: &str,
    rhs: &str,
) -> Result<String, CalcError> {
    let a: f64 = lhs.parse().map_err(|_| CalcError::InvalidOperand)?;
    let b: f64 = rhs.parse().map_err(|_| CalcError::InvalidOperand)?;
    if !a.is_finite() || !b.is_finite() {
        return Err(CalcError::InvalidOperand);
    }
    // Guards against feeding oversized chained results back into the backend;
    // typed input is already capped at entry.
    if lhs.chars().count() > MAX_INPUT_LEN || rhs.chars().count() > MAX_INPUT_LEN {
        return Err(CalcError::InputTooLong);
    }
    if op == Operator::Div && b == 0.0 {
        return Err(CalcError::Overflow);
    }

    let result = op.apply(backend, a, b).map_err(|e| {
        tracing::warn!(target: "calc", "backend error on {} {} {}: {e}", lhs, op.symbol(), rhs);
        CalcError::BackendFailure
    })?;

    if !result.is_finite() {
        return Err(CalcError::Overflow);
    }
    let text = result.to_string();
    if text.chars().count() > MAX_RESULT_LEN {
        return Err(CalcError::Overflow);
    }
    Ok(text)
}

/// The controller. One instance per app, created cleared, reset by
/// [`Calculator::clear`], never destroyed before process exit.
pub struct Calculator {
    current: String,
    operand: String,
    operator: Option<Operator>,
    waiting_for_operand: bool,
    backend: BackendHandle,
    display: String,
    updates: u64,
}

impl Calculator {
    pub fn new(backend: BackendHandle) -> Self {
        let mut calc = Self {
            current: String::new(),
            operand: String::new(),
            operator: None,
            waiting_for_operand: false,
            backend,
            display: String::new(),
            updates: 0,
        };
        calc.clear();
        calc
    }

    /// The text currently on the display surface.
    pub fn display(&self) -> &str {
        &self.display
    }

    /// Bumped on every display update, including updates to the same text.
    /// The UI pulses whenever it observes a new value.
    pub fn updates(&self) -> u64 {
        self.updates
    }

    pub fn operator(&self) -> Option<Operator> {
        self.operator
    }

    pub fn current(&self) -> &str {
        &self.current
    }

    pub fn operand(&self) -> &str {
        &self.operand
    }

    pub fn waiting_for_operand(&self) -> bool {
        self.waiting_for_operand
    }

    pub fn backend_state(&self) -> BackendState {
        self.backend.state()
    }

    /// Digit or decimal-point entry. Works in every backend state.
    pub fn press_digit(&mut self, c: char) {
        if !c.is_ascii_digit() && c != '.' {
            return;
        }
        if self.waiting_for_operand {
            self.current.clear();
            self.waiting_for_operand = false;
        } else if self.operator.is_none() && !self.operand.is_empty() {
            // Typing right after equals starts a new computation; discard the
            // stale result instead of letting it collide with fresh digits.
            self.operand.clear();
        }
        if c == '.' && self.current.contains('.') {
            return;
        }
        if self.current.chars().count() + 1 > MAX_INPUT_LEN {
            self.show(CalcError::InputTooLong.sentinel());
            return;
        }
        self.current.push(c);
        tracing::trace!(target: "calc", "current = {:?}", self.current);
        let text = self.current.clone();
        self.show(&text);
    }

    /// Operator entry. Resolves any pending operation first so chains like
    /// `3 + 4 + 5` feed the partial result forward. A repeat press with no
    /// fresh operand replaces the pending operator.
    pub fn press_operator(&mut self, op: Operator) {
        if self.current.is_empty() && self.operand.is_empty() {
            return;
        }
        let backend = match self.gate() {
            Ok(b) => b,
            Err(_) => return,
        };

        if !self.operand.is_empty() && !self.current.is_empty() {
            let pending = self.operator;
            let outcome = self.resolve(backend.as_ref(), pending);
            self.show(&outcome);
            self.operand = outcome;
            self.current.clear();
        } else if !self.current.is_empty() {
            self.operand = std::mem::take(&mut self.current);
        }
        tracing::debug!(target: "calc", "operator {:?} armed, operand = {:?}", op, self.operand);
        self.operator = Some(op);
        self.waiting_for_operand = true;
    }

    /// Equals entry. No-op unless an operator and both operands are present;
    /// repeated presses without new input are idempotent because the first
    /// press clears the operator.
    pub fn press_equals(&mut self) {
        if self.operator.is_none() || self.operand.is_empty() || self.current.is_empty() {
            return;
        }
        let backend = match self.gate() {
            Ok(b) => b,
            Err(_) => return,
        };

        let pending = self.operator;
        let outcome = self.resolve(backend.as_ref(), pending);
        tracing::debug!(
            target: "calc",
            "{} {} {} = {}",
            self.operand,
            pending.map(Operator::symbol).unwrap_or('?'),
            self.current,
            outcome
        );
        self.show(&outcome);
        self.operand = outcome;
        self.current.clear();
        self.operator = None;
        self.waiting_for_operand = false;
    }

    /// Resets every field and shows `0`. Valid from any state, including
    /// after sentinels and while the backend is still loading or failed.
    pub fn clear(&mut self) {
        self.current.clear();
        self.operand.clear();
        self.operator = None;
        self.waiting_for_operand = false;
        self.show("0");
    }

    // Readiness gate for operator/equals: outside Ready nothing is mutated,
    // only the pending or load-failure sentinel is shown.
    fn gate(&mut self) -> Result<std::sync::Arc<dyn ArithmeticBackend>, CalcError> {
        match self.backend.state() {
            BackendState::Ready(b) => Ok(b),
            BackendState::Loading => {
                self.show(CalcError::PendingInit.sentinel());
                Err(CalcError::PendingInit)
            }
            BackendState::Failed(_) => {
                self.show(CalcError::LoadFailure.sentinel());
                Err(CalcError::LoadFailure)
            }
        }
    }

    // Resolution outcome as display text. Sentinels flow into `operand` like
    // numeric results; a chain through `Err` stays `Err` until Clear.
    fn resolve(&self, backend: &dyn ArithmeticBackend, op: Option<Operator>) -> String {
        let Some(op) = op else {
            // Unreachable through the public surface: both operands present
            // implies an armed operator, because a digit typed after equals
            // discards the stale result first.
            return CalcError::InvalidOperand.sentinel().to_string();
        };
        match calculate(backend, op, &self.operand, &self.current) {
            Ok(text) => text,
            Err(e) => e.sentinel().to_string(),
        }
    }

    fn show(&mut self, text: &str) {
        self.display.clear();
        self.display.push_str(text);
        self.updates += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::NativeBackend;

    fn ready_calc() -> Calculator {
        Calculator::new(BackendHandle::ready(NativeBackend))
    }

    /// Drives the controller with a compact key script: digits and `.` enter
    /// digits, `+-*/` arm operators, `=` resolves, `C` clears.
    fn press(calc: &mut Calculator, script: &str) {
        for c in script.chars() {
            if let Some(op) = Operator::from_char(c) {
                calc.press_operator(op);
            } else if c == '=' {
                calc.press_equals();
            } else if c == 'C' {
                calc.clear();
            } else {
                calc.press_digit(c);
            }
        }
    }

    #[test]
    fn starts_cleared_showing_zero() {
        let calc = ready_calc();
        assert_eq!(calc.display(), "0");
        assert_eq!(calc.current(), "");
        assert_eq!(calc.operand(), "");
        assert_eq!(calc.operator(), None);
        assert!(!calc.waiting_for_operand());
    }

    #[test]
    fn digits_accumulate_in_order() {
        let mut calc = ready_calc();
        press(&mut calc, "120.5");
        assert_eq!(calc.display(), "120.5");
        assert_eq!(calc.current(), "120.5");
    }

    #[test]
    fn second_decimal_point_is_ignored() {
        let mut calc = ready_calc();
        press(&mut calc, "1.2.3");
        assert_eq!(calc.current(), "1.23");
    }

    #[test]
    fn input_cap_shows_max_and_keeps_current() {
        let mut calc = ready_calc();
        let fifteen = "123456789012345";
        press(&mut calc, fifteen);
        assert_eq!(calc.current(), fifteen);
        press(&mut calc, "6");
        assert_eq!(calc.display(), "MAX");
        assert_eq!(calc.current(), fifteen);
    }

    #[test]
    fn simple_addition() {
        let mut calc = ready_calc();
        press(&mut calc, "3+4=");
        assert_eq!(calc.display(), "7");
        assert_eq!(calc.operand(), "7");
        assert_eq!(calc.current(), "");
        assert_eq!(calc.operator(), None);
    }

    #[test]
    fn operator_chaining_feeds_partial_result_forward() {
        let mut calc = ready_calc();
        press(&mut calc, "3+4+5=");
        assert_eq!(calc.display(), "12");
    }

    #[test]
    fn chaining_shows_intermediate_result_on_operator_press() {
        let mut calc = ready_calc();
        press(&mut calc, "3+4+");
        assert_eq!(calc.display(), "7");
        assert_eq!(calc.operand(), "7");
        assert!(calc.waiting_for_operand());
    }

    #[test]
    fn repeated_equals_is_idempotent() {
        let mut calc = ready_calc();
        press(&mut calc, "3+4=");
        let updates = calc.updates();
        press(&mut calc, "=");
        assert_eq!(calc.display(), "7");
        assert_eq!(calc.updates(), updates);
    }

    // Upstream leaves a second operator press with no intervening digit
    // unspecified; we replace the pending operator.
    #[test]
    fn second_operator_press_replaces_pending_operator() {
        let mut calc = ready_calc();
        press(&mut calc, "3+-4=");
        assert_eq!(calc.display(), "-1");
    }

    #[test]
    fn operator_with_nothing_entered_is_ignored() {
        let mut calc = ready_calc();
        press(&mut calc, "+");
        assert_eq!(calc.display(), "0");
        assert_eq!(calc.operator(), None);
    }

    #[test]
    fn equals_without_pending_operation_is_ignored() {
        let mut calc = ready_calc();
        press(&mut calc, "5=");
        assert_eq!(calc.display(), "5");
        assert_eq!(calc.current(), "5");
    }

    #[test]
    fn division_by_zero_shows_infinity_sentinel() {
        let mut calc = ready_calc();
        press(&mut calc, "8/0=");
        assert_eq!(calc.display(), "∞");
    }

    #[test]
    fn sentinel_result_poisons_the_chain_until_clear() {
        let mut calc = ready_calc();
        press(&mut calc, "8/0=+1=");
        assert_eq!(calc.display(), "Err");
        press(&mut calc, "C2+2=");
        assert_eq!(calc.display(), "4");
    }

    #[test]
    fn oversized_result_shows_infinity_sentinel() {
        let mut calc = ready_calc();
        // 999999999999999 * 999999999999999 needs 30 digits.
        press(&mut calc, "999999999999999*999999999999999=");
        assert_eq!(calc.display(), "∞");
    }

    #[test]
    fn decimal_only_operand_is_an_invalid_operand() {
        let mut calc = ready_calc();
        press(&mut calc, ".+1=");
        assert_eq!(calc.display(), "Err");
    }

    #[test]
    fn clear_resets_everything_from_any_state() {
        let mut calc = ready_calc();
        press(&mut calc, "12+34");
        press(&mut calc, "C");
        assert_eq!(calc.display(), "0");
        assert_eq!(calc.current(), "");
        assert_eq!(calc.operand(), "");
        assert_eq!(calc.operator(), None);
        assert!(!calc.waiting_for_operand());
    }

    #[test]
    fn typing_after_equals_starts_a_fresh_computation() {
        let mut calc = ready_calc();
        press(&mut calc, "3+4=");
        press(&mut calc, "9*2=");
        assert_eq!(calc.display(), "18");
        assert_eq!(calc.operand(), "18");
    }

    #[test]
    fn fresh_operand_starts_after_operator() {
        let mut calc = ready_calc();
        press(&mut calc, "12+3");
        assert_eq!(calc.current(), "3");
        assert_eq!(calc.operand(), "12");
    }

    #[test]
    fn operator_press_before_readiness_shows_pending_and_mutates_nothing() {
        let mut calc = Calculator::new(BackendHandle::loading());
        press(&mut calc, "3+");
        assert_eq!(calc.display(), "...");
        assert_eq!(calc.current(), "3");
        assert_eq!(calc.operand(), "");
        assert_eq!(calc.operator(), None);
    }

    #[test]
    fn digits_still_enter_while_backend_loads() {
        let mut calc = Calculator::new(BackendHandle::loading());
        press(&mut calc, "3");
        assert_eq!(calc.current(), "3");
        // Equals has no armed operator (the operator press never captured
        // one while loading), so it is a plain no-op, not a sentinel.
        press(&mut calc, "=");
        assert_eq!(calc.display(), "3");
    }

    #[test]
    fn failed_backend_shows_err_but_digits_and_clear_work() {
        let mut calc = Calculator::new(BackendHandle::failed("wasm module missing"));
        press(&mut calc, "3+");
        assert_eq!(calc.display(), "ERR");
        assert_eq!(calc.operator(), None);
        press(&mut calc, "7");
        assert_eq!(calc.display(), "7");
        press(&mut calc, "C");
        assert_eq!(calc.display(), "0");
    }

    #[test]
    fn calculate_matches_native_arithmetic() {
        let b = NativeBackend;
        assert_eq!(calculate(&b, Operator::Add, "2", "3").unwrap(), "5");
        assert_eq!(calculate(&b, Operator::Sub, "2", "3").unwrap(), "-1");
        assert_eq!(calculate(&b, Operator::Mul, "2.5", "4").unwrap(), "10");
        assert_eq!(calculate(&b, Operator::Div, "9", "3").unwrap(), "3");
    }

    #[test]
    fn calculate_guards_oversized_operands() {
        let b = NativeBackend;
        let wide = "1234567890123456"; // 16 chars, one past the cap
        assert_eq!(
            calculate(&b, Operator::Add, wide, "1"),
            Err(CalcError::InputTooLong)
        );
    }

    #[test]
    fn calculate_rejects_non_numeric_operands() {
        let b = NativeBackend;
        assert_eq!(
            calculate(&b, Operator::Add, "∞", "1"),
            Err(CalcError::InvalidOperand)
        );
        assert_eq!(
            calculate(&b, Operator::Add, "inf", "1"),
            Err(CalcError::InvalidOperand)
        );
    }

    #[test]
    fn backend_failure_surfaces_as_err() {
        struct Flaky;
        impl ArithmeticBackend for Flaky {
            fn add(&self, _: f64, _: f64) -> Result<f64, BackendError> {
                Err(BackendError::Fault("adder offline".into()))
            }
            fn sub(&self, a: f64, b: f64) -> Result<f64, BackendError> {
                Ok(a - b)
            }
            fn mul(&self, a: f64, b: f64) -> Result<f64, BackendError> {
                Ok(a * b)
            }
            fn div(&self, a: f64, b: f64) -> Result<f64, BackendError> {
                Ok(a / b)
            }
        }
        assert_eq!(
            calculate(&Flaky, Operator::Add, "1", "2"),
            Err(CalcError::BackendFailure)
        );
    }
}
