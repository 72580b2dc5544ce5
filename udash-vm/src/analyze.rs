#![forbid(unsafe_code)]

use std::collections::{BTreeMap, HashMap, HashSet};

use udash_ast::{Program, TokenId};

use crate::canvas::Canvas;
use crate::config::VmConfig;
use crate::error::Result;
use crate::{Environment, Vm};

/// Shadow of the operand stack recording which token produced each slot.
#[derive(Clone, Debug)]
pub(crate) struct Provenance {
    // Parallel to the operand stack; `None` for the root marker.
    shadow: Vec<Option<TokenId>>,
    args: HashMap<TokenId, Vec<TokenId>>,
    pub(crate) saves: usize,
}

impl Provenance {
    pub(crate) fn new() -> Self {
        Self {
            shadow: vec![None],
            args: HashMap::new(),
            saves: 0,
        }
    }

    pub(crate) fn clear_records(&mut self) {
        self.args.clear();
        self.saves = 0;
    }

    pub(crate) fn begin(&mut self, token: TokenId) {
        self.args.entry(token).or_default();
    }

    pub(crate) fn on_push(&mut self, current: Option<TokenId>) {
        self.shadow.push(current);
    }

    pub(crate) fn on_pop(&mut self, current: Option<TokenId>) {
        let source = self.shadow.pop().flatten();
        if let (Some(current), Some(source)) = (current, source) {
            self.args.entry(current).or_default().push(source);
        }
    }

    pub(crate) fn tail(&self, from: usize) -> Vec<Option<TokenId>> {
        self.shadow.get(from..).map(<[_]>::to_vec).unwrap_or_default()
    }

    pub(crate) fn restore_tail(&mut self, from: usize, tail: Vec<Option<TokenId>>) {
        self.shadow.truncate(from);
        self.shadow.extend(tail);
    }

    // A peek counts as consuming the value and re-producing it.
    pub(crate) fn on_peek(&mut self, index: usize, current: Option<TokenId>) {
        let Some(slot) = self.shadow.get_mut(index) else {
            return;
        };
        if let (Some(current), Some(source)) = (current, *slot) {
            self.args.entry(current).or_default().push(source);
            *slot = Some(current);
        }
    }
}

/// A [`Vm`] that also records, for every executed token, which earlier
/// tokens produced the values it consumed.
///
/// Records are rebuilt by every `run`.
#[derive(Clone, Debug)]
pub struct Analyzer {
    vm: Vm,
}

impl Default for Analyzer {
    fn default() -> Self {
        Self::new(VmConfig::default())
    }
}

impl Analyzer {
    pub fn new(config: VmConfig) -> Self {
        Self {
            vm: Vm::with_provenance(config),
        }
    }

    pub fn run(
        &mut self,
        program: &Program,
        label: &str,
        env: &Environment,
        canvas: &mut dyn Canvas,
    ) -> Result<()> {
        self.vm.run(program, label, env, canvas)
    }

    pub fn vm(&self) -> &Vm {
        &self.vm
    }

    pub fn into_vm(self) -> Vm {
        self.vm
    }

    /// Producers of the values `token` consumed, in consumption order.
    pub fn arguments(&self, token: TokenId) -> &[TokenId] {
        self.vm
            .provenance
            .as_ref()
            .and_then(|p| p.args.get(&token))
            .map_or(&[], Vec::as_slice)
    }

    /// Whether `token` executed during the last run.
    pub fn executed(&self, token: TokenId) -> bool {
        self.vm
            .provenance
            .as_ref()
            .is_some_and(|p| p.args.contains_key(&token))
    }

    /// All dependency records of the last run, keyed by consumer.
    pub fn records(&self) -> BTreeMap<TokenId, Vec<TokenId>> {
        self.vm
            .provenance
            .as_ref()
            .map(|p| p.args.iter().map(|(k, v)| (*k, v.clone())).collect())
            .unwrap_or_default()
    }

    /// Saves of the last run still open at its end. A `restore` with no
    /// open save is not counted.
    pub fn save_depth(&self) -> usize {
        self.vm.provenance.as_ref().map_or(0, |p| p.saves)
    }

    /// Every token `token` transitively depends on, with its distance.
    /// Depth-first; each token is reported once and `token` itself is left
    /// out.
    pub fn trace(&self, token: TokenId) -> Vec<(TokenId, usize)> {
        let mut out = Vec::new();
        let mut seen = HashSet::new();
        let mut pending = vec![(token, 0usize)];

        while let Some((current, depth)) = pending.pop() {
            if !seen.insert(current) {
                continue;
            }
            if current != token {
                out.push((current, depth));
            }
            pending.extend(self.arguments(current).iter().map(|&arg| (arg, depth + 1)));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Recorder;
    use udash_ast::Position;
    use udash_compile::compile;

    fn analyze(src: &str) -> (Program, Analyzer) {
        let program = compile(src).unwrap();
        let mut analyzer = Analyzer::default();
        analyzer
            .run(&program, "main", &Environment::new(), &mut Recorder::new())
            .unwrap();
        (program, analyzer)
    }

    fn at(program: &Program, column: u32) -> TokenId {
        program.token_at(Position::new(0, column)).unwrap().id
    }

    #[test]
    fn dup_traces_through_addition() {
        let (program, analyzer) = analyze("main: 1 2 + dup");
        let (one, two, plus, dup) = (at(&program, 1), at(&program, 2), at(&program, 3), at(&program, 4));

        assert_eq!(analyzer.trace(dup), vec![(plus, 1), (one, 2), (two, 2)]);
        let from_plus: Vec<_> = analyzer.trace(plus).into_iter().map(|(t, _)| t).collect();
        assert!(!from_plus.contains(&dup));
        assert_eq!(analyzer.arguments(plus), &[two, one]);
        assert_eq!(analyzer.vm().stack().len(), 2);
    }

    #[test]
    fn literals_have_no_dependencies() {
        let (program, analyzer) = analyze("main: 1 2 +");
        assert!(analyzer.trace(at(&program, 1)).is_empty());
        assert!(analyzer.executed(at(&program, 1)));
    }

    #[test]
    fn root_marker_has_no_producer() {
        let (program, analyzer) = analyze("main: new 10 10 rectangle fill");
        let fill = at(&program, 5);
        let new = at(&program, 1);
        let traced: Vec<_> = analyzer.trace(fill).into_iter().map(|(t, _)| t).collect();
        assert!(traced.contains(&new));
    }

    #[test]
    fn nested_calls_restore_the_current_token() {
        let (program, analyzer) = analyze("main: 2 square 1 +\nsquare: dup *\n");
        let plus = at(&program, 4);
        let square = at(&program, 2);
        let traced: Vec<_> = analyzer.trace(plus).into_iter().map(|(t, _)| t).collect();
        assert!(!traced.contains(&square));
        assert!(traced.contains(&at(&program, 1)));
        assert_eq!(analyzer.vm().stack(), &[crate::Value::Number(5.0)]);
    }

    #[test]
    fn save_depth_counts_unmatched_saves() {
        let (_, analyzer) = analyze("main: save save restore");
        assert_eq!(analyzer.save_depth(), 1);
    }

    #[test]
    fn unmatched_restores_do_not_lower_save_depth() {
        let (_, analyzer) = analyze("main: restore restore save");
        assert_eq!(analyzer.save_depth(), 1);
    }

    #[test]
    fn failed_opcode_keeps_operand_provenance() {
        let program = compile("main: 1 :a + 2 +").unwrap();
        let mut analyzer = Analyzer::default();
        let result = analyzer.run(&program, "main", &Environment::new(), &mut Recorder::new());
        assert!(result.is_err());
        let shadow = &analyzer.vm.provenance.as_ref().unwrap().shadow;
        assert_eq!(shadow, &vec![None, Some(at(&program, 1)), Some(at(&program, 2))]);
        assert_eq!(analyzer.vm().stack().len(), 2);
    }

    #[test]
    fn records_are_rebuilt_each_run() {
        let program = compile("main: 1 dup").unwrap();
        let mut analyzer = Analyzer::default();
        let env = Environment::new();
        analyzer.run(&program, "main", &env, &mut Recorder::new()).unwrap();
        let first = analyzer.records();
        analyzer.run(&program, "main", &env, &mut Recorder::new()).unwrap();
        assert_eq!(analyzer.records(), first);
    }

    #[test]
    fn cycles_terminate() {
        let mut p = Provenance::new();
        let (a, b) = (TokenId::new(0), TokenId::new(1));
        p.args.insert(a, vec![b]);
        p.args.insert(b, vec![a]);
        let mut analyzer = Analyzer::default();
        analyzer.vm.provenance = Some(p);
        assert_eq!(analyzer.trace(a), vec![(b, 1)]);
    }
}
