//! Complete-linkage agglomerative clustering with a flat distance cutoff
//! (§9: "squareform conversion of the distance matrix, complete-linkage
//! dendrogram, flat cut at the threshold distance").

/// Cluster `n` items given a pairwise distance function, cutting the
/// dendrogram flat at `cutoff`. Returns each cluster as a list of the
/// original indices it contains; singleton clusters are included.
pub fn complete_linkage_clusters(n: usize, dist: impl Fn(usize, usize) -> f64, cutoff: f64) -> Vec<Vec<usize>> {
    if n == 0 {
        return Vec::new();
    }
    if n == 1 {
        return vec![vec![0]];
    }

    let mut members: Vec<Option<Vec<usize>>> = (0..n).map(|i| Some(vec![i])).collect();
    let mut dmat = vec![vec![0.0f64; n]; n];
    for a in 0..n {
        for b in 0..n {
            dmat[a][b] = dist(a, b);
        }
    }

    loop {
        let alive: Vec<usize> = (0..n).filter(|i| members[*i].is_some()).collect();
        if alive.len() <= 1 {
            break;
        }

        let mut best: Option<(f64, usize, usize)> = None;
        for (pos, &a) in alive.iter().enumerate() {
            for &b in &alive[pos + 1..] {
                let d = dmat[a][b];
                if best.is_none_or(|(bd, _, _)| d < bd) {
                    best = Some((d, a, b));
                }
            }
        }
        let (d, a, b) = best.expect("alive.len() > 1");
        if d > cutoff {
            break;
        }

        let merged = {
            let mut m = members[a].take().expect("a is alive");
            m.extend(members[b].take().expect("b is alive"));
            m
        };
        for &k in &alive {
            if k == a || k == b {
                continue;
            }
            // complete linkage: distance to a merged cluster is the max of
            // its members' distances to the other cluster.
            let new_d = dmat[a][k].max(dmat[b][k]);
            dmat[a][k] = new_d;
            dmat[k][a] = new_d;
        }
        members[a] = Some(merged);
    }

    members.into_iter().flatten().collect()
}
