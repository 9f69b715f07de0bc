use crate::error::EngineError;
use crate::service::ServiceSpec;
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

/*
    @@@
    @startup_order();
    . Returns indices into 'specs' in the order services must be started.
    . A service comes after its dependency; among services that are ready at the same time,
      lower priority goes first, then declaration order.
    . Services left over once nothing is ready form (or hang off) a cycle and are reported.
    . Dependencies must already be validated: a name that matches no service is treated as absent.
*/
pub fn startup_order(specs: &[ServiceSpec]) -> Result<Vec<usize>, EngineError> {
    let index: HashMap<&str, usize> = specs
        .iter()
        .enumerate()
        .map(|(i, s)| (s.name.as_str(), i))
        .collect();

    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); specs.len()];
    let mut ready = BinaryHeap::new();
    for (i, spec) in specs.iter().enumerate() {
        match spec.dependency.as_deref().and_then(|d| index.get(d)) {
            Some(&dep) => dependents[dep].push(i),
            None => ready.push(Reverse((spec.priority, i))),
        }
    }

    let mut order = Vec::with_capacity(specs.len());
    while let Some(Reverse((_, i))) = ready.pop() {
        order.push(i);
        for &next in &dependents[i] {
            ready.push(Reverse((specs[next].priority, next)));
        }
    }

    if order.len() < specs.len() {
        let mut placed = vec![false; specs.len()];
        for &i in &order {
            placed[i] = true;
        }
        let services = specs
            .iter()
            .zip(placed)
            .filter(|(_, p)| !p)
            .map(|(s, _)| s.name.clone())
            .collect();
        return Err(EngineError::DependencyCycle { services });
    }
    Ok(order)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn svc(name: &str, dep: Option<&str>, priority: i32) -> ServiceSpec {
        let mut spec = ServiceSpec::new(name, "/bin/true");
        spec.dependency = dep.map(String::from);
        spec.priority = priority;
        spec
    }

    fn names(specs: &[ServiceSpec], order: &[usize]) -> Vec<String> {
        order.iter().map(|&i| specs[i].name.clone()).collect()
    }

    #[test]
    fn test_priority_orders_independent_services() {
        let specs = vec![svc("web", None, 10), svc("db", None, 1), svc("cache", None, 1)];
        let order = startup_order(&specs).unwrap();
        assert_eq!(names(&specs, &order), vec!["db", "cache", "web"]);
    }

    #[test]
    fn test_dependency_beats_priority() {
        let specs = vec![svc("api", Some("db"), -20), svc("db", None, 19)];
        let order = startup_order(&specs).unwrap();
        assert_eq!(names(&specs, &order), vec!["db", "api"]);
    }

    #[test]
    fn test_chain() {
        let specs = vec![
            svc("frontend", Some("api"), 0),
            svc("api", Some("db"), 0),
            svc("db", None, 0),
            svc("metrics", None, 5),
        ];
        let order = startup_order(&specs).unwrap();
        assert_eq!(names(&specs, &order), vec!["db", "api", "frontend", "metrics"]);
    }

    #[test]
    fn test_cycle_detected() {
        let specs = vec![svc("a", Some("b"), 0), svc("b", Some("a"), 0), svc("c", None, 0)];
        match startup_order(&specs).unwrap_err() {
            EngineError::DependencyCycle { services } => assert_eq!(services, vec!["a", "b"]),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_self_dependency_is_a_cycle() {
        let specs = vec![svc("a", Some("a"), 0)];
        assert!(matches!(
            startup_order(&specs),
            Err(EngineError::DependencyCycle { .. })
        ));
    }
}
