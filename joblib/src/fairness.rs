use std::collections::VecDeque;

/// Round-robin regrouping of jobs by owner.
///
/// Jobs are grouped by owner, keeping each owner's own order and the order in
/// which owners first appear. The result takes one job from each owner per
/// pass until every job is placed, so no owner's backlog can put more than one
/// of its jobs ahead of another owner's first job.
pub(crate) fn tidy<T, F>(jobs: Vec<T>, owner_of: F) -> Vec<T>
where
    F: Fn(&T) -> &str,
{
    let total = jobs.len();
    let mut groups: Vec<(String, VecDeque<T>)> = Vec::new();
    for job in jobs {
        let owner = owner_of(&job);
        match groups.iter().position(|(seen, _)| seen == owner) {
            Some(idx) => groups[idx].1.push_back(job),
            None => {
                let owner = owner.to_string();
                groups.push((owner, VecDeque::from([job])));
            }
        }
    }

    let mut tidied = Vec::with_capacity(total);
    while tidied.len() < total {
        for (_, backlog) in groups.iter_mut() {
            if let Some(job) = backlog.pop_front() {
                tidied.push(job);
            }
        }
    }
    tidied
}
